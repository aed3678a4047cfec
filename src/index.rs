//! Index building: one pass over the archive producing namespace entries
//!
//! Entry inodes start at [`FIRST_ENTRY_INO`] and increase by one per
//! payload record in archive order. Inode [`ROOT_INO`] belongs to the root
//! directory and is never handed to an entry.

use crate::archive::ArchiveReader;
use crate::config::Materialization;
use crate::error::Result;
use tracing::info;

/// Root directory inode (FUSE convention)
pub const ROOT_INO: u64 = 1;

/// Inode of the first record in the archive
pub const FIRST_ENTRY_INO: u64 = 2;

/// Replaces path separators so every URL is a single path segment
pub const NAME_SUBSTITUTE: char = '_';

/// Turn a record URL into a file name
///
/// Only `/` and `\` are replaced; distinct URLs may still collide.
pub fn sanitize_name(url: &str) -> String {
    url.replace(['/', '\\'], &NAME_SUBSTITUTE.to_string())
}

/// Where an entry's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Payload copied into memory at build time
    Materialized(Vec<u8>),
    /// Record start in the decompressed archive stream, re-read on demand
    Locator { offset: u64 },
}

/// One file in the namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub ino: u64,
    pub name: String,
    /// Target URI as recorded in the archive
    pub url: String,
    pub size: u64,
    pub content: Content,
}

impl Entry {
    pub fn is_materialized(&self) -> bool {
        matches!(self.content, Content::Materialized(_))
    }
}

/// Builds the entry list from an archive
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder {
    materialization: Materialization,
}

impl IndexBuilder {
    pub fn new(materialization: Materialization) -> Self {
        Self { materialization }
    }

    /// Scan the archive from its start to end of stream
    ///
    /// Any decode error aborts the build; no partial list is returned.
    pub fn build(&self, reader: &mut ArchiveReader) -> Result<Vec<Entry>> {
        if reader.position() != 0 {
            reader.reset()?;
        }

        let mut entries = Vec::new();
        let mut total_bytes = 0u64;

        while let Some(record) = reader.next_record()? {
            let ino = FIRST_ENTRY_INO + entries.len() as u64;
            let url = record.url().to_string();
            let size = record.declared_size();

            let content = match self.materialization {
                Materialization::Eager => Content::Materialized(record.read_payload()?),
                Materialization::Lazy => Content::Locator {
                    offset: record.offset(),
                },
            };

            total_bytes += size;
            entries.push(Entry {
                ino,
                name: sanitize_name(&url),
                url,
                size,
                content,
            });
        }

        info!(
            entries = entries.len(),
            total_bytes,
            materialization = ?self.materialization,
            "Built archive index"
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use crate::error::WarcFsError;

    fn two_record_archive() -> Vec<u8> {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer.add_resource("http://a/b", "text/plain", b"abcd").unwrap();
        writer.add_resource("http://a/c", "text/plain", b"").unwrap();
        writer.finalize().unwrap()
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("http://a/b"), "http:__a_b");
        assert_eq!(sanitize_name(r"C:\dir\file"), "C:_dir_file");
        assert_eq!(sanitize_name("plain?q=1&x=%2F"), "plain?q=1&x=%2F");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_sanitize_touches_only_separators() {
        let url = "https://ex.com/a b/ü?x=\\y#frag";
        let name = sanitize_name(url);
        assert_eq!(name.chars().count(), url.chars().count());
        for (original, sanitized) in url.chars().zip(name.chars()) {
            if original == '/' || original == '\\' {
                assert_eq!(sanitized, NAME_SUBSTITUTE);
            } else {
                assert_eq!(sanitized, original);
            }
        }
    }

    #[test]
    fn test_eager_build() {
        let mut reader = ArchiveReader::from_bytes(two_record_archive()).unwrap();
        let entries = IndexBuilder::new(Materialization::Eager)
            .build(&mut reader)
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ino, 2);
        assert_eq!(entries[0].name, "http:__a_b");
        assert_eq!(entries[0].url, "http://a/b");
        assert_eq!(entries[0].size, 4);
        assert_eq!(entries[0].content, Content::Materialized(b"abcd".to_vec()));
        assert_eq!(entries[1].ino, 3);
        assert_eq!(entries[1].name, "http:__a_c");
        assert_eq!(entries[1].size, 0);
        assert_eq!(entries[1].content, Content::Materialized(Vec::new()));
    }

    #[test]
    fn test_lazy_build_records_offsets() {
        let mut reader = ArchiveReader::from_bytes(two_record_archive()).unwrap();
        let entries = IndexBuilder::new(Materialization::Lazy)
            .build(&mut reader)
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, Content::Locator { offset: 0 });
        assert!(matches!(entries[1].content, Content::Locator { offset } if offset > 0));
        assert!(!entries[1].is_materialized());
        assert_eq!(entries[0].size, 4);
    }

    #[test]
    fn test_build_twice_rewinds() {
        let mut reader = ArchiveReader::from_bytes(two_record_archive()).unwrap();
        let builder = IndexBuilder::default();
        let first = builder.build(&mut reader).unwrap();
        let second = builder.build(&mut reader).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_archive() {
        let mut reader = ArchiveReader::from_bytes(Vec::new()).unwrap();
        let entries = IndexBuilder::default().build(&mut reader).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_decode_error_aborts_build() {
        let mut bytes = two_record_archive();
        bytes.extend_from_slice(b"WARC/1.1\r\nWARC-Type: resource\r\n\r\n");

        let mut reader = ArchiveReader::from_bytes(bytes).unwrap();
        let result = IndexBuilder::default().build(&mut reader);
        assert!(matches!(result, Err(WarcFsError::MalformedRecord { .. })));
    }

    #[test]
    fn test_truncated_payload_aborts_eager_build() {
        let mut bytes = two_record_archive();
        bytes.extend_from_slice(
            b"WARC/1.1\r\nWARC-Type: resource\r\nWARC-Target-URI: http://t/\r\nContent-Length: 50\r\n\r\nshort",
        );

        let mut reader = ArchiveReader::from_bytes(bytes).unwrap();
        let result = IndexBuilder::new(Materialization::Eager).build(&mut reader);
        assert!(matches!(result, Err(WarcFsError::Truncated { .. })));
    }
}
