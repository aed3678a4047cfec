//! Mount configuration
//!
//! Every field has a default, so an empty TOML file (or none at all) is a
//! valid configuration:
//!
//! ```toml
//! materialization = "lazy"
//! strip_http_headers = false
//! fsname = "crawl-2024"
//! allow_other = true
//! ttl_secs = 5
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How payload bytes reach the namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    /// Read every payload into memory while indexing
    #[default]
    Eager,
    /// Keep record offsets and re-decode the archive on each read
    ///
    /// Every read rewinds to the start of the archive and decodes forward to
    /// the record, then reads the whole payload. The kernel reads a file in
    /// chunks, so reading a large file costs time quadratic in its size, and
    /// records late in a big compressed archive are slow to reach. Reads of
    /// all files are serialized on one archive handle.
    Lazy,
}

/// Settings for building and mounting a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MountConfig {
    pub materialization: Materialization,

    /// Remove the HTTP status line and headers from `response` payloads
    pub strip_http_headers: bool,

    /// Filesystem name shown in mount output
    pub fsname: String,

    pub subtype: String,

    /// Allow users other than the mounting user to access the mount
    pub allow_other: bool,

    /// Attribute and entry cache lifetime handed to the kernel
    pub ttl_secs: u64,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            materialization: Materialization::Eager,
            strip_http_headers: true,
            fsname: "warcmount".to_string(),
            subtype: "warcmountfs".to_string(),
            allow_other: false,
            ttl_secs: 1,
        }
    }
}

impl MountConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Mount point named after the archive, with up to two extensions removed
///
/// `crawl.warc.gz` becomes `crawl`, relative to the current directory.
pub fn default_mountpoint(archive: &Path) -> Option<PathBuf> {
    let stem = Path::new(archive.file_name()?).file_stem()?;
    let stem = Path::new(stem).file_stem()?;
    Some(PathBuf::from(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarcFsError;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MountConfig::from_toml_str("").unwrap();
        assert_eq!(config, MountConfig::default());
        assert_eq!(config.materialization, Materialization::Eager);
        assert!(config.strip_http_headers);
        assert_eq!(config.ttl(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_config() {
        let config = MountConfig::from_toml_str(
            r#"
            materialization = "lazy"
            fsname = "crawl"
            ttl_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.materialization, Materialization::Lazy);
        assert_eq!(config.fsname, "crawl");
        assert_eq!(config.subtype, "warcmountfs");
        assert_eq!(config.ttl_secs, 30);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = MountConfig::from_toml_str("read_write = true");
        assert!(matches!(result, Err(WarcFsError::Config(_))));
    }

    #[test]
    fn test_bad_strategy_rejected() {
        let result = MountConfig::from_toml_str(r#"materialization = "sometimes""#);
        assert!(matches!(result, Err(WarcFsError::Config(_))));
    }

    #[test]
    fn test_default_mountpoint() {
        let cases = [
            ("/data/crawl.warc.gz", "crawl"),
            ("crawl.warc", "crawl"),
            ("crawl", "crawl"),
            ("dir/site.2024.warc.gz", "site.2024"),
        ];
        for (archive, expected) in cases {
            assert_eq!(
                default_mountpoint(Path::new(archive)),
                Some(PathBuf::from(expected))
            );
        }
        assert_eq!(default_mountpoint(Path::new("/")), None);
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "strip_http_headers = false")?;
        writeln!(file, "allow_other = true")?;

        let config = MountConfig::load(file.path())?;
        assert!(!config.strip_http_headers);
        assert!(config.allow_other);
        Ok(())
    }
}
