//! Read-only namespace over a built index
//!
//! Entries are kept in archive order. The name and inode maps are derived
//! from that list at construction and never change afterwards. When two
//! URLs sanitize to the same name, the later record wins name lookups while
//! both stay in the listing.

use crate::archive::ArchiveReader;
use crate::config::{Materialization, MountConfig};
use crate::error::{Result, WarcFsError};
use crate::index::{Content, Entry, IndexBuilder};
use crate::node::{FileNode, Node, Root};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace, warn};

/// Name and inode index over archive entries
pub struct Namespace {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_ino: HashMap<u64, usize>,
    /// Archive handle for entries stored as locators; one scan at a time
    archive: Option<Mutex<ArchiveReader>>,
}

impl Namespace {
    /// Open an archive file and build its namespace according to `config`
    pub fn open<P: AsRef<Path>>(path: P, config: &MountConfig) -> Result<Self> {
        let reader = ArchiveReader::open(path)?.strip_http_headers(config.strip_http_headers);
        Self::build(reader, config.materialization)
    }

    /// Build from a reader; lazy namespaces keep the reader for later reads
    pub fn build(mut reader: ArchiveReader, materialization: Materialization) -> Result<Self> {
        let entries = IndexBuilder::new(materialization).build(&mut reader)?;
        let archive = match materialization {
            Materialization::Eager => None,
            Materialization::Lazy => Some(Mutex::new(reader)),
        };
        Ok(Self::with_archive(entries, archive))
    }

    /// Wrap an already built entry list with no archive behind it
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self::with_archive(entries, None)
    }

    fn with_archive(entries: Vec<Entry>, archive: Option<Mutex<ArchiveReader>>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_ino = HashMap::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            if let Some(shadowed) = by_name.insert(entry.name.clone(), index) {
                debug!(
                    name = %entry.name,
                    shadowed_ino = entries[shadowed].ino,
                    ino = entry.ino,
                    "Later record shadows an earlier entry with the same name"
                );
            }
            by_ino.insert(entry.ino, index);
        }

        Self {
            entries,
            by_name,
            by_ino,
            archive,
        }
    }

    /// Exact, case-sensitive lookup by sanitized name
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        let found = self.by_name.get(name).map(|&index| &self.entries[index]);
        if found.is_none() {
            trace!(name, "Lookup missed");
        }
        found
    }

    /// All entries in archive order
    pub fn list(&self) -> &[Entry] {
        &self.entries
    }

    /// Resolve an inode previously handed out
    pub fn get(&self, ino: u64) -> Option<&Entry> {
        self.by_ino.get(&ino).map(|&index| &self.entries[index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    /// The single directory node
    pub fn root(&self) -> Root<'_> {
        Root::new(self)
    }

    /// Node for any inode, root included
    pub fn node(&self, ino: u64) -> Option<Node<'_>> {
        if ino == crate::index::ROOT_INO {
            return Some(Node::Root(self.root()));
        }
        self.get(ino)
            .map(|entry| Node::File(FileNode::new(self, entry)))
    }

    /// Payload bytes of an entry belonging to this namespace
    pub(crate) fn read_content<'a>(&'a self, entry: &'a Entry) -> Result<Cow<'a, [u8]>> {
        match &entry.content {
            Content::Materialized(bytes) => Ok(Cow::Borrowed(bytes)),
            Content::Locator { offset } => {
                self.read_located(entry, *offset)
                    .map(Cow::Owned)
                    .map_err(|err| {
                        warn!(name = %entry.name, offset, error = %err, "Lazy read failed");
                        err
                    })
            }
        }
    }

    /// Re-decode one record while holding the archive lock for the whole scan
    fn read_located(&self, entry: &Entry, offset: u64) -> Result<Vec<u8>> {
        let unavailable = |reason: &str| WarcFsError::ContentUnavailable {
            name: entry.name.clone(),
            reason: reason.to_string(),
        };

        let archive = self
            .archive
            .as_ref()
            .ok_or_else(|| unavailable("namespace has no archive handle"))?;
        // A panicked reader left mid-record is rewound by seek_record below
        let mut reader = archive.lock().unwrap_or_else(PoisonError::into_inner);

        reader.seek_record(offset)?;
        let record = reader
            .next_record()?
            .ok_or_else(|| unavailable("no record at recorded offset"))?;

        if record.offset() != offset
            || record.url() != entry.url
            || record.declared_size() != entry.size
        {
            return Err(unavailable("record at recorded offset no longer matches"));
        }
        record.read_payload()
    }
}
