//! Virtual node model: the root directory and one file per entry
//!
//! Nodes borrow the [`Namespace`] they came from and carry no state of
//! their own, so any number of them can be used from any number of threads.

use crate::error::Result;
use crate::index::{Entry, ROOT_INO};
use crate::namespace::Namespace;
use std::borrow::Cow;

/// Permission bits of the root directory (r-xr-xr-x)
pub const ROOT_PERM: u16 = 0o555;

/// Permission bits of every file (r--r--r--)
pub const FILE_PERM: u16 = 0o444;

/// File type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// Attributes reported for a node
///
/// No timestamps or ownership are tracked; adapters fill those in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: u64,
    pub kind: FileKind,
    /// Permissions (mode & 0o7777)
    pub perm: u16,
    pub size: u64,
    pub nlink: u32,
}

/// Directory entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub name: String,
    pub kind: FileKind,
}

/// A node in the namespace
#[derive(Clone, Copy)]
pub enum Node<'a> {
    Root(Root<'a>),
    File(FileNode<'a>),
}

impl<'a> Node<'a> {
    pub fn attributes(&self) -> FileAttr {
        match self {
            Node::Root(root) => root.attributes(),
            Node::File(file) => file.attributes(),
        }
    }

    pub fn ino(&self) -> u64 {
        match self {
            Node::Root(_) => ROOT_INO,
            Node::File(file) => file.entry().ino,
        }
    }

    pub fn kind(&self) -> FileKind {
        match self {
            Node::Root(_) => FileKind::Directory,
            Node::File(_) => FileKind::RegularFile,
        }
    }
}

/// The single directory holding every entry
#[derive(Clone, Copy)]
pub struct Root<'a> {
    namespace: &'a Namespace,
}

impl<'a> Root<'a> {
    pub(crate) fn new(namespace: &'a Namespace) -> Self {
        Self { namespace }
    }

    pub fn attributes(&self) -> FileAttr {
        FileAttr {
            ino: ROOT_INO,
            kind: FileKind::Directory,
            perm: ROOT_PERM,
            size: 0,
            nlink: 2,
        }
    }

    /// Resolve a child by name; `None` means "no such entry"
    pub fn lookup(&self, name: &str) -> Option<FileNode<'a>> {
        self.namespace
            .lookup(name)
            .map(|entry| FileNode::new(self.namespace, entry))
    }

    /// Children in archive order
    pub fn list_children(&self) -> Vec<DirEntry> {
        self.namespace
            .list()
            .iter()
            .map(|entry| DirEntry {
                ino: entry.ino,
                name: entry.name.clone(),
                kind: FileKind::RegularFile,
            })
            .collect()
    }
}

/// A regular file backed by one archive entry
#[derive(Clone, Copy)]
pub struct FileNode<'a> {
    namespace: &'a Namespace,
    entry: &'a Entry,
}

impl<'a> FileNode<'a> {
    pub(crate) fn new(namespace: &'a Namespace, entry: &'a Entry) -> Self {
        Self { namespace, entry }
    }

    pub fn entry(&self) -> &'a Entry {
        self.entry
    }

    pub fn attributes(&self) -> FileAttr {
        FileAttr {
            ino: self.entry.ino,
            kind: FileKind::RegularFile,
            perm: FILE_PERM,
            size: self.entry.size,
            nlink: 1,
        }
    }

    /// The whole payload
    ///
    /// Never fails for materialized entries. Lazy entries re-read the
    /// archive and report its I/O or decode errors.
    pub fn read_all(&self) -> Result<Cow<'a, [u8]>> {
        self.namespace.read_content(self.entry)
    }
}
