//! Warcfs-rs: browse WARC web archives as a read-only directory
//!
//! The archive is scanned once and every captured payload becomes one file
//! in a flat namespace:
//! - WARC record decoding (plain and gzip, HTTP header stripping)
//! - Index building with eager or lazy payload materialization
//! - Name and inode lookup over an immutable namespace
//! - A root-directory/file node model, mountable through FUSE (`fuse` feature)
//!
//! # Example
//!
//! ```no_run
//! use warcfs_rs::{MountConfig, Namespace};
//!
//! let namespace = Namespace::open("crawl.warc.gz", &MountConfig::default())?;
//! let root = namespace.root();
//!
//! for child in root.list_children() {
//!     let file = root.lookup(&child.name).expect("listed entries resolve");
//!     println!("{} ({} bytes)", child.name, file.attributes().size);
//! }
//! # Ok::<(), warcfs_rs::error::WarcFsError>(())
//! ```

// Core modules
pub mod archive;
pub mod config;
pub mod error;
pub mod index;
pub mod namespace;
pub mod node;

#[cfg(feature = "fuse")]
pub mod fuse;

// Re-export commonly used types
pub use archive::{ArchiveReader, ArchiveWriter, Record, RecordType};
pub use config::{default_mountpoint, Materialization, MountConfig};
pub use error::{Result, WarcFsError};
pub use index::{sanitize_name, Content, Entry, IndexBuilder, FIRST_ENTRY_INO, ROOT_INO};
pub use namespace::Namespace;
pub use node::{DirEntry, FileAttr, FileKind, FileNode, Node, Root, FILE_PERM, ROOT_PERM};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Ensure core types are accessible
        let _strategy = Materialization::Eager;
        let _config = MountConfig::default();
        assert_eq!(ROOT_INO, 1);
        assert_eq!(FIRST_ENTRY_INO, 2);
    }
}
