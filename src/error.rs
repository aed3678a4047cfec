use std::io;
use thiserror::Error;

/// Result type for warcfs operations
pub type Result<T> = std::result::Result<T, WarcFsError>;

/// Unified error type for all warcfs operations
#[derive(Debug, Error)]
pub enum WarcFsError {
    // Archive errors
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Malformed record at offset {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: String },

    #[error("Record at offset {offset} is truncated")]
    Truncated { offset: u64 },

    // Namespace errors
    #[error("No such entry: {0}")]
    EntryNotFound(String),

    #[error("No such inode: {0}")]
    InodeNotFound(u64),

    #[error("Content of {name} is no longer available: {reason}")]
    ContentUnavailable { name: String, reason: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WarcFsError {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        WarcFsError::MalformedRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error is the routine "no such entry" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WarcFsError::EntryNotFound(_) | WarcFsError::InodeNotFound(_)
        )
    }

    /// Map the error onto the errno a filesystem adapter should reply with
    ///
    /// The values are spelled out because `libc` is only linked with the
    /// `fuse` feature; they match `libc::ENOENT` and `libc::EIO`.
    pub fn errno(&self) -> i32 {
        const ENOENT: i32 = 2;
        const EIO: i32 = 5;

        if self.is_not_found() {
            ENOENT
        } else {
            EIO
        }
    }
}

impl From<toml::de::Error> for WarcFsError {
    fn from(err: toml::de::Error) -> Self {
        WarcFsError::Config(err.to_string())
    }
}

impl From<WarcFsError> for io::Error {
    fn from(err: WarcFsError) -> io::Error {
        match err {
            WarcFsError::Io(inner) => inner,
            other if other.is_not_found() => {
                io::Error::new(io::ErrorKind::NotFound, other.to_string())
            }
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
