//! Corruption detection
//!
//! Damaged archives must fail the build outright; no partial namespace is
//! ever produced.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use warcfs_rs::{ArchiveWriter, MountConfig, Namespace, WarcFsError};

/// Helper: Create a valid test archive
fn create_test_archive(gzip: bool) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = ArchiveWriter::create(temp_file.path())
        .unwrap()
        .with_gzip(gzip);
    writer
        .add_resource("http://test/hello", "text/plain", b"Hello, World!")
        .unwrap();
    writer
        .add_resource("http://test/data", "application/octet-stream", &[0xAB; 1024])
        .unwrap();
    writer.finalize().unwrap();
    temp_file
}

/// Helper: Truncate file at specific offset
fn truncate_at(path: &Path, new_length: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(new_length).unwrap();
}

/// Helper: Append raw bytes
fn append(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

#[test]
fn test_missing_file() {
    let result = Namespace::open("/nonexistent/archive.warc", &MountConfig::default());
    assert!(matches!(result, Err(WarcFsError::Io(_))));
}

#[test]
fn test_not_a_warc_file() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), b"<!DOCTYPE html><html></html>").unwrap();

    let result = Namespace::open(temp_file.path(), &MountConfig::default());
    assert!(matches!(result, Err(WarcFsError::InvalidArchive(_))));
}

#[test]
fn test_truncated_payload() {
    let temp_file = create_test_archive(false);
    let len = std::fs::metadata(temp_file.path()).unwrap().len();
    truncate_at(temp_file.path(), len - 100);

    let result = Namespace::open(temp_file.path(), &MountConfig::default());
    assert!(matches!(result, Err(WarcFsError::Truncated { .. })));
}

#[test]
fn test_truncated_header() {
    let temp_file = create_test_archive(false);
    append(temp_file.path(), b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Le");

    let result = Namespace::open(temp_file.path(), &MountConfig::default());
    assert!(matches!(result, Err(WarcFsError::Truncated { .. })));
}

#[test]
fn test_malformed_record_mid_stream() {
    let temp_file = create_test_archive(false);
    append(
        temp_file.path(),
        b"WARC/1.1\r\nWARC-Type: resource\r\nWARC-Target-URI: http://x/\r\nContent-Length: many\r\n\r\n",
    );

    for config in [
        MountConfig::default(),
        MountConfig {
            materialization: warcfs_rs::Materialization::Lazy,
            ..MountConfig::default()
        },
    ] {
        let result = Namespace::open(temp_file.path(), &config);
        match result {
            Err(WarcFsError::MalformedRecord { offset, reason }) => {
                assert!(offset > 0);
                assert!(reason.contains("Content-Length"));
            }
            Err(other) => panic!("Expected MalformedRecord, got: {:?}", other),
            Ok(_) => panic!("Expected MalformedRecord, got a namespace"),
        }
    }
}

#[test]
fn test_garbage_after_last_record() {
    let temp_file = create_test_archive(false);
    append(temp_file.path(), b"\r\nthis is not a record\r\n");

    let result = Namespace::open(temp_file.path(), &MountConfig::default());
    assert!(matches!(result, Err(WarcFsError::MalformedRecord { .. })));
}

#[test]
fn test_truncated_gzip_archive() {
    let temp_file = create_test_archive(true);
    let len = std::fs::metadata(temp_file.path()).unwrap().len();
    truncate_at(temp_file.path(), len - 10);

    let result = Namespace::open(temp_file.path(), &MountConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_http_header_overrunning_block() {
    let temp_file = NamedTempFile::new().unwrap();
    {
        let mut writer = ArchiveWriter::create(temp_file.path()).unwrap();
        writer
            .add_record(
                warcfs_rs::RecordType::Response,
                Some("http://bad/"),
                Some("application/http; msgtype=response"),
                b"HTTP/1.1 200 OK\r\nContent-Type: text/plain",
            )
            .unwrap();
        writer.finalize().unwrap();
    }

    let result = Namespace::open(temp_file.path(), &MountConfig::default());
    assert!(matches!(result, Err(WarcFsError::MalformedRecord { .. })));
}
