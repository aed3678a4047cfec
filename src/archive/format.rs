use crate::error::{Result, WarcFsError};
use std::fmt;

/// Every record begins with a version line carrying this prefix
pub const WARC_VERSION_PREFIX: &str = "WARC/";

/// Version written by [`ArchiveWriter`](super::ArchiveWriter)
pub const WARC_VERSION: &str = "WARC/1.1";

/// Gzip member magic bytes (RFC 1952)
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Longest header line accepted before the record is declared malformed
pub const MAX_HEADER_LINE: usize = 64 * 1024;

/// Upper bound on header lines per record (WARC or embedded HTTP)
pub const MAX_HEADER_FIELDS: usize = 1024;

/// Content-Type prefix marking a block that holds an HTTP message
pub const HTTP_CONTENT_TYPE: &str = "application/http";

/// WARC record types (ISO 28500 section 6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    Warcinfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,
    Other(String),
}

impl RecordType {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "warcinfo" => Self::Warcinfo,
            "response" => Self::Response,
            "resource" => Self::Resource,
            "request" => Self::Request,
            "metadata" => Self::Metadata,
            "revisit" => Self::Revisit,
            "conversion" => Self::Conversion,
            "continuation" => Self::Continuation,
            _ => Self::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Warcinfo => "warcinfo",
            Self::Response => "response",
            Self::Resource => "resource",
            Self::Request => "request",
            Self::Metadata => "metadata",
            Self::Revisit => "revisit",
            Self::Conversion => "conversion",
            Self::Continuation => "continuation",
            Self::Other(value) => value,
        }
    }

    /// Records whose block is a captured payload worth exposing as a file
    pub fn carries_payload(&self) -> bool {
        matches!(self, Self::Response | Self::Resource | Self::Conversion)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed WARC header block of a single record
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub version: String,
    pub fields: Vec<(String, String)>,
}

impl RecordHeader {
    /// Case-insensitive field lookup; the first occurrence wins
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn record_type(&self, offset: u64) -> Result<RecordType> {
        self.get("WARC-Type")
            .map(RecordType::parse)
            .ok_or_else(|| WarcFsError::malformed(offset, "missing WARC-Type"))
    }

    pub fn content_length(&self, offset: u64) -> Result<u64> {
        let raw = self
            .get("Content-Length")
            .ok_or_else(|| WarcFsError::malformed(offset, "missing Content-Length"))?;
        raw.trim().parse().map_err(|_| {
            WarcFsError::malformed(offset, format!("invalid Content-Length: {:?}", raw))
        })
    }

    /// Target URI with the `<...>` wrapping of early WARC 1.0 writers removed
    pub fn target_uri(&self) -> Option<&str> {
        self.get("WARC-Target-URI").map(|uri| {
            let uri = uri.trim();
            uri.strip_prefix('<')
                .and_then(|inner| inner.strip_suffix('>'))
                .unwrap_or(uri)
        })
    }

    pub fn is_http_block(&self) -> bool {
        self.get("Content-Type")
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with(HTTP_CONTENT_TYPE))
            .unwrap_or(false)
    }
}

/// Strip a trailing LF or CRLF
pub(crate) fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Lines beginning with SP or HT continue the previous field value
pub(crate) fn is_continuation(line: &[u8]) -> bool {
    matches!(line.first(), Some(b' ') | Some(b'\t'))
}

/// Split a `Name: value` line
pub(crate) fn parse_field(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
