/// Basic example: write a small WARC, index it, browse it
///
/// Run with: cargo run --example basic
use std::error::Error;
use warcfs_rs::{ArchiveWriter, MountConfig, Namespace};

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== warcfs-rs Basic Example ===\n");

    println!("1. Creating archive...");
    create_archive()?;

    println!("\n2. Browsing archive...");
    browse_archive()?;

    println!("\nExample complete!");
    Ok(())
}

fn create_archive() -> Result<(), Box<dyn Error>> {
    let mut writer = ArchiveWriter::create("example_basic.warc.gz")?.with_gzip(true);

    writer.add_warcinfo("software: warcfs-rs basic example\r\n")?;
    writer.add_response(
        "https://example.com/",
        "text/html",
        b"<html><body>Example Domain</body></html>",
    )?;
    writer.add_response(
        "https://example.com/robots.txt",
        "text/plain",
        b"User-agent: *\nDisallow:\n",
    )?;
    writer.add_resource("urn:example:notes", "text/markdown", b"# Notes\n")?;

    writer.finalize()?;
    println!("   Archive created: example_basic.warc.gz");
    Ok(())
}

fn browse_archive() -> Result<(), Box<dyn Error>> {
    let namespace = Namespace::open("example_basic.warc.gz", &MountConfig::default())?;
    let root = namespace.root();

    println!("   {} entries, {} bytes", namespace.len(), namespace.total_size());
    for child in root.list_children() {
        let Some(file) = root.lookup(&child.name) else {
            continue;
        };
        let attr = file.attributes();
        println!("   [{}] {:o} {:>6}  {}", attr.ino, attr.perm, attr.size, child.name);
    }

    let robots = root
        .lookup("https:__example.com_robots.txt")
        .ok_or("robots.txt missing")?;
    println!("\n   robots.txt:\n{}", String::from_utf8_lossy(&robots.read_all()?));

    std::fs::remove_file("example_basic.warc.gz")?;
    Ok(())
}
