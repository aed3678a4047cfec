/// Lazy materialization example: payloads stay in the archive until read
///
/// Run with: cargo run --example lazy
use std::error::Error;
use warcfs_rs::{ArchiveWriter, Content, Materialization, MountConfig, Namespace};

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== warcfs-rs Lazy Example ===\n");

    let mut writer = ArchiveWriter::create("example_lazy.warc")?;
    for i in 0..5 {
        let body = format!("page {} ", i).repeat(1000);
        writer.add_response(&format!("http://site.test/page/{}", i), "text/plain", body.as_bytes())?;
    }
    writer.finalize()?;

    let config = MountConfig {
        materialization: Materialization::Lazy,
        ..MountConfig::default()
    };
    let namespace = Namespace::open("example_lazy.warc", &config)?;

    for entry in namespace.list() {
        if let Content::Locator { offset } = entry.content {
            println!("   {} -> record at byte {}, {} bytes", entry.name, offset, entry.size);
        }
    }

    let page = namespace
        .root()
        .lookup("http:__site.test_page_3")
        .ok_or("page 3 missing")?;
    let data = page.read_all()?;
    println!("\n   Re-read {} bytes of page 3 from the archive", data.len());

    std::fs::remove_file("example_lazy.warc")?;
    println!("\nExample complete!");
    Ok(())
}
