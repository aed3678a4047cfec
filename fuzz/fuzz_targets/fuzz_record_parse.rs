#![no_main]

use libfuzzer_sys::fuzz_target;
use warcfs_rs::{ArchiveReader, Materialization, Namespace};

fuzz_target!(|data: &[u8]| {
    // Walk every record directly - should never panic
    if let Ok(mut reader) = ArchiveReader::from_bytes(data) {
        while let Ok(Some(record)) = reader.next_record() {
            let _ = record.url();
            let _ = record.read_payload();
        }
    }

    // Build both namespace flavours and exercise the node model
    for materialization in [Materialization::Eager, Materialization::Lazy] {
        let reader = match ArchiveReader::from_bytes(data) {
            Ok(r) => r,
            Err(_) => return, // Expected for invalid data
        };
        let namespace = match Namespace::build(reader, materialization) {
            Ok(ns) => ns,
            Err(_) => continue, // Expected for corrupted data
        };

        let root = namespace.root();
        for child in root.list_children() {
            if let Some(file) = root.lookup(&child.name) {
                let size = file.attributes().size;
                if let Ok(bytes) = file.read_all() {
                    assert_eq!(bytes.len() as u64, size);
                }
            }
        }
        let _ = root.lookup("");
        let _ = root.lookup("../../../etc/passwd");
    }
});
