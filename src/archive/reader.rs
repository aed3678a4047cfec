use crate::archive::format::{
    is_continuation, parse_field, trim_line_end, RecordHeader, RecordType, GZIP_MAGIC,
    MAX_HEADER_FIELDS, MAX_HEADER_LINE, WARC_VERSION_PREFIX,
};
use crate::error::{Result, WarcFsError};
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Initial payload buffer ceiling, so a bogus Content-Length cannot force a huge allocation
const MAX_PREALLOCATION: u64 = 1024 * 1024;

/// Where the archive bytes come from; kept so the stream can be reopened
#[derive(Debug, Clone)]
enum Origin {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// Sequential WARC record reader
///
/// Plain and gzip-compressed (multi-member) archives are both accepted.
/// Records are decoded in archive order; only payload-bearing records
/// (`response`, `resource`, `conversion` with a target URI) are returned.
pub struct ArchiveReader {
    origin: Origin,
    input: Box<dyn BufRead + Send>,
    /// Bytes consumed from the (decompressed) stream
    position: u64,
    /// Unread payload bytes of the record last handed out
    remaining: u64,
    current_offset: u64,
    strip_http_headers: bool,
}

impl ArchiveReader {
    /// Open an archive file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let origin = Origin::File(path.as_ref().to_path_buf());
        Self::from_origin(origin)
    }

    /// Read an archive held in memory
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes: Vec<u8> = bytes.into();
        Self::from_origin(Origin::Memory(bytes.into()))
    }

    fn from_origin(origin: Origin) -> Result<Self> {
        let mut input = open_input(&origin)?;
        check_leading_version(&mut input)?;

        Ok(Self {
            origin,
            input,
            position: 0,
            remaining: 0,
            current_offset: 0,
            strip_http_headers: true,
        })
    }

    /// Choose whether HTTP status line and headers are removed from `response` payloads
    pub fn strip_http_headers(mut self, strip: bool) -> Self {
        self.strip_http_headers = strip;
        self
    }

    /// Byte position in the decompressed stream
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Rewind to the start of the archive
    pub fn reset(&mut self) -> Result<()> {
        self.input = open_input(&self.origin)?;
        self.position = 0;
        self.remaining = 0;
        self.current_offset = 0;
        Ok(())
    }

    /// Rewind and advance to a record start previously reported by [`Record::offset`]
    pub fn seek_record(&mut self, offset: u64) -> Result<()> {
        self.reset()?;
        self.discard(offset, offset)
    }

    /// Decode the next payload-bearing record, or `None` at end of archive
    ///
    /// Whatever is left unread of the previous record is skipped first.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        if self.remaining > 0 {
            let (left, offset) = (self.remaining, self.current_offset);
            self.remaining = 0;
            self.discard(left, offset)?;
        }

        loop {
            let Some((offset, header)) = self.read_header()? else {
                return Ok(None);
            };
            let record_type = header.record_type(offset)?;
            let length = header.content_length(offset)?;

            let url = match header.target_uri() {
                Some(uri) if record_type.carries_payload() => uri.to_string(),
                _ => {
                    debug!(offset, %record_type, length, "Skipping non-payload record");
                    self.discard(length, offset)?;
                    continue;
                }
            };

            let mut declared_size = length;
            if self.strip_http_headers
                && record_type == RecordType::Response
                && header.is_http_block()
            {
                declared_size -= self.skip_http_header(offset, length)?;
            }

            self.remaining = declared_size;
            self.current_offset = offset;
            return Ok(Some(Record {
                header,
                record_type,
                url,
                declared_size,
                offset,
                reader: self,
            }));
        }
    }

    /// Read the version line and header fields of the next record
    fn read_header(&mut self) -> Result<Option<(u64, RecordHeader)>> {
        let (offset, version) = loop {
            let offset = self.position;
            let Some(line) = self.read_line(MAX_HEADER_LINE as u64 + 1, offset)? else {
                return Ok(None);
            };
            let text = trim_line_end(&line);

            // Record trailers and stray blank lines between records
            if text.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if !line.ends_with(b"\n") {
                return Err(WarcFsError::Truncated { offset });
            }

            let text = String::from_utf8_lossy(text);
            if !text.starts_with(WARC_VERSION_PREFIX) {
                let shown: String = text.chars().take(32).collect();
                return Err(WarcFsError::malformed(
                    offset,
                    format!("expected WARC version line, found {:?}", shown),
                ));
            }
            break (offset, text.trim().to_string());
        };

        let mut fields: Vec<(String, String)> = Vec::new();
        loop {
            let line = self
                .read_line(MAX_HEADER_LINE as u64 + 1, offset)?
                .ok_or(WarcFsError::Truncated { offset })?;
            if !line.ends_with(b"\n") {
                return Err(WarcFsError::Truncated { offset });
            }

            let text = trim_line_end(&line);
            if text.is_empty() {
                break;
            }
            if fields.len() >= MAX_HEADER_FIELDS {
                return Err(WarcFsError::malformed(offset, "too many header fields"));
            }

            if is_continuation(text) {
                let (_, value) = fields.last_mut().ok_or_else(|| {
                    WarcFsError::malformed(offset, "continuation line before first field")
                })?;
                value.push(' ');
                value.push_str(String::from_utf8_lossy(text).trim());
            } else {
                let text = String::from_utf8_lossy(text);
                let field = parse_field(&text).ok_or_else(|| {
                    WarcFsError::malformed(offset, format!("invalid header line {:?}", text))
                })?;
                fields.push(field);
            }
        }

        Ok(Some((offset, RecordHeader { version, fields })))
    }

    /// Consume the HTTP status line and headers at the start of a block
    ///
    /// Returns the number of block bytes consumed.
    fn skip_http_header(&mut self, offset: u64, length: u64) -> Result<u64> {
        let mut consumed = 0u64;
        let mut lines = 0usize;

        while consumed < length {
            let limit = (length - consumed).min(MAX_HEADER_LINE as u64 + 1);
            let line = self
                .read_line(limit, offset)?
                .ok_or(WarcFsError::Truncated { offset })?;
            consumed += line.len() as u64;

            if !line.ends_with(b"\n") {
                if consumed == length {
                    return Err(WarcFsError::malformed(
                        offset,
                        "HTTP header runs past the end of the record block",
                    ));
                }
                return Err(WarcFsError::Truncated { offset });
            }
            if trim_line_end(&line).is_empty() {
                return Ok(consumed);
            }

            lines += 1;
            if lines > MAX_HEADER_FIELDS {
                return Err(WarcFsError::malformed(offset, "too many HTTP header lines"));
            }
        }

        // An empty block has no HTTP header to strip
        if length == 0 {
            return Ok(0);
        }
        Err(WarcFsError::malformed(
            offset,
            "HTTP header runs past the end of the record block",
        ))
    }

    /// Read one line of at most `limit` bytes; `None` at end of stream
    fn read_line(&mut self, limit: u64, offset: u64) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = (&mut self.input)
            .take(limit)
            .read_until(b'\n', &mut line)?;
        self.position += read as u64;

        if read == 0 {
            return Ok(None);
        }
        if line.len() > MAX_HEADER_LINE {
            return Err(WarcFsError::malformed(offset, "header line too long"));
        }
        Ok(Some(line))
    }

    /// Skip exactly `count` bytes, failing with a truncation error at end of stream
    fn discard(&mut self, count: u64, offset: u64) -> Result<()> {
        let copied = io::copy(&mut (&mut self.input).take(count), &mut io::sink())?;
        self.position += copied;
        if copied < count {
            return Err(WarcFsError::Truncated { offset });
        }
        Ok(())
    }
}

/// One payload-bearing record, readable for exactly [`Record::declared_size`] bytes
pub struct Record<'a> {
    header: RecordHeader,
    record_type: RecordType,
    url: String,
    declared_size: u64,
    offset: u64,
    reader: &'a mut ArchiveReader,
}

impl Record<'_> {
    /// Target URI of the capture
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Payload length in bytes, after any HTTP header stripping
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Offset of the record's version line in the decompressed stream
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Read the whole payload
    pub fn read_payload(mut self) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(self.declared_size.min(MAX_PREALLOCATION) as usize);
        match self.read_to_end(&mut payload) {
            Ok(_) => Ok(payload),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Err(WarcFsError::Truncated {
                    offset: self.offset,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl Read for Record<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = &mut *self.reader;
        if reader.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = usize::try_from(reader.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let read = reader.input.read(&mut buf[..max])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record block ends before its declared length",
            ));
        }

        reader.remaining -= read as u64;
        reader.position += read as u64;
        Ok(read)
    }
}

/// Open the origin, transparently decompressing gzip input
fn open_input(origin: &Origin) -> Result<Box<dyn BufRead + Send>> {
    let raw: Box<dyn Read + Send> = match origin {
        Origin::File(path) => Box::new(File::open(path)?),
        Origin::Memory(bytes) => Box::new(Cursor::new(Arc::clone(bytes))),
    };

    let mut buffered = BufReader::new(raw);
    if buffered.fill_buf()?.starts_with(&GZIP_MAGIC) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(buffered))))
    } else {
        Ok(Box::new(buffered))
    }
}

/// A non-empty archive must open with a WARC version line
fn check_leading_version(input: &mut dyn BufRead) -> Result<()> {
    let head = input
        .fill_buf()
        .map_err(|e| WarcFsError::InvalidArchive(format!("unreadable archive stream: {}", e)))?;

    let prefix = WARC_VERSION_PREFIX.as_bytes();
    let n = head.len().min(prefix.len());
    if head[..n] != prefix[..n] {
        return Err(WarcFsError::InvalidArchive(
            "stream does not begin with a WARC version line".to_string(),
        ));
    }
    Ok(())
}
