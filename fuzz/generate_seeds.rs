//! Generate seed corpus for fuzzing

use std::fs;
use warcfs_rs::{ArchiveWriter, RecordType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_record_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Empty archive (no records)
    {
        let path = format!("{}/seed_empty.warc", corpus_dir);
        fs::write(&path, b"")?;
        println!("Generated: {}", path);
    }

    // Seed 2: Single resource
    {
        let path = format!("{}/seed_single_resource.warc", corpus_dir);
        let mut writer = ArchiveWriter::create(&path)?;
        writer.add_resource("http://example.com/", "text/plain", b"Hello, World!")?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 3: Crawl-shaped archive with warcinfo, request and response
    {
        let path = format!("{}/seed_crawl.warc", corpus_dir);
        let mut writer = ArchiveWriter::create(&path)?;
        writer.add_warcinfo("software: warcfs-rs\r\nformat: WARC File Format 1.1\r\n")?;
        writer.add_record(
            RecordType::Request,
            Some("http://example.com/a"),
            Some("application/http; msgtype=request"),
            b"GET /a HTTP/1.1\r\nHost: example.com\r\n\r\n",
        )?;
        writer.add_response("http://example.com/a", "text/html", b"<html>a</html>")?;
        writer.add_response("http://example.com/b", "text/html", b"")?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 4: Gzip members
    {
        let path = format!("{}/seed_gzip.warc.gz", corpus_dir);
        let mut writer = ArchiveWriter::create(&path)?.with_gzip(true);
        writer.add_resource("http://example.com/1", "text/plain", b"one")?;
        writer.add_resource("http://example.com/2", "text/plain", b"two")?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    // Seed 5: Binary payload
    {
        let path = format!("{}/seed_binary.warc", corpus_dir);
        let mut writer = ArchiveWriter::create(&path)?;
        let binary_data: Vec<u8> = (0..=255).collect();
        writer.add_resource("http://example.com/bin", "application/octet-stream", &binary_data)?;
        writer.finalize()?;
        println!("Generated: {}", path);
    }

    println!("\nSeed corpus ready in {}", corpus_dir);
    Ok(())
}
