use crate::archive::format::{RecordType, HTTP_CONTENT_TYPE, WARC_VERSION};
use crate::error::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Date stamped on records unless [`ArchiveWriter::with_date`] overrides it
pub const DEFAULT_WARC_DATE: &str = "2000-01-01T00:00:00Z";

/// WARC writer producing well-formed WARC/1.1 records
///
/// With gzip enabled each record becomes its own gzip member, the layout
/// `.warc.gz` files use.
pub struct ArchiveWriter<W: Write> {
    writer: W,
    gzip: bool,
    date: String,
    records_written: u64,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Create a new archive file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            gzip: false,
            date: DEFAULT_WARC_DATE.to_string(),
            records_written: 0,
        }
    }

    /// Compress each record as a separate gzip member
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Set the `WARC-Date` written on subsequent records
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Number of records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Add a `response` record wrapping `body` in a `200 OK` HTTP envelope
    pub fn add_response(&mut self, url: &str, content_type: &str, body: &[u8]) -> Result<()> {
        let mut block = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            content_type,
            body.len()
        )
        .into_bytes();
        block.extend_from_slice(body);

        let http_type = format!("{}; msgtype=response", HTTP_CONTENT_TYPE);
        self.add_record(RecordType::Response, Some(url), Some(&http_type), &block)
    }

    /// Add a `resource` record holding `body` verbatim
    pub fn add_resource(&mut self, url: &str, content_type: &str, body: &[u8]) -> Result<()> {
        self.add_record(RecordType::Resource, Some(url), Some(content_type), body)
    }

    /// Add a `warcinfo` record describing the archive
    pub fn add_warcinfo(&mut self, info: &str) -> Result<()> {
        self.add_record(
            RecordType::Warcinfo,
            None,
            Some("application/warc-fields"),
            info.as_bytes(),
        )
    }

    /// Add a record of any type with a raw block
    pub fn add_record(
        &mut self,
        record_type: RecordType,
        url: Option<&str>,
        content_type: Option<&str>,
        block: &[u8],
    ) -> Result<()> {
        let mut header = format!(
            "{}\r\nWARC-Type: {}\r\nWARC-Record-ID: <urn:warcfs:record:{}>\r\nWARC-Date: {}\r\n",
            WARC_VERSION, record_type, self.records_written, self.date
        );
        if let Some(url) = url {
            header.push_str(&format!("WARC-Target-URI: {}\r\n", url));
        }
        if let Some(content_type) = content_type {
            header.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        header.push_str(&format!("Content-Length: {}\r\n\r\n", block.len()));

        if self.gzip {
            let mut member = GzEncoder::new(Vec::new(), Compression::default());
            write_record(&mut member, &header, block)?;
            self.writer.write_all(&member.finish()?)?;
        } else {
            write_record(&mut self.writer, &header, block)?;
        }

        self.records_written += 1;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn finalize(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn write_record<W: Write>(writer: &mut W, header: &str, block: &[u8]) -> Result<()> {
    writer.write_all(header.as_bytes())?;
    writer.write_all(block)?;
    writer.write_all(b"\r\n\r\n")?;
    Ok(())
}
