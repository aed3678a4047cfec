//! FUSE adapter for a [`Namespace`]
//!
//! Translates kernel requests into node model calls. The namespace is
//! read-only, so every handler is a pure query; write access is refused
//! with `EROFS`.
//!
//! ```bash
//! warcmount crawl.warc.gz          # mounts at ./crawl
//! ls crawl
//! cat 'crawl/http:__example.com_'
//! ```

use crate::config::MountConfig;
use crate::error::{Result, WarcFsError};
use crate::index::ROOT_INO;
use crate::namespace::Namespace;
use crate::node::{DirEntry, FileAttr, FileKind, FileNode, Node};
use fuser::{
    FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, Request, Session,
};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, info};

const BLOCK_SIZE: u64 = 4096;

/// Longest file name reported through `statfs`
const MAX_NAME_LENGTH: u32 = 255;

impl From<FileKind> for FileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Directory => FileType::Directory,
            FileKind::RegularFile => FileType::RegularFile,
        }
    }
}

/// Read-only filesystem serving one archive namespace
pub struct WarcFs {
    namespace: Namespace,
    ttl: Duration,
    uid: u32,
    gid: u32,
}

impl WarcFs {
    pub fn new(namespace: Namespace, config: &MountConfig) -> Self {
        Self {
            namespace,
            ttl: config.ttl(),
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Node for an inode the kernel handed back
    fn resolve(&self, ino: u64) -> Result<Node<'_>> {
        self.namespace
            .node(ino)
            .ok_or(WarcFsError::InodeNotFound(ino))
    }

    /// Child of the root by name
    fn resolve_child(&self, name: &OsStr) -> Result<FileNode<'_>> {
        name.to_str()
            .and_then(|name| self.namespace.root().lookup(name))
            .ok_or_else(|| WarcFsError::EntryNotFound(name.to_string_lossy().into_owned()))
    }

    fn kernel_attr(&self, attr: FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            crtime: UNIX_EPOCH,
            kind: attr.kind.into(),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE as u32,
            flags: 0,
        }
    }
}

impl Filesystem for WarcFs {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut KernelConfig,
    ) -> std::result::Result<(), libc::c_int> {
        info!(
            entries = self.namespace.len(),
            total_bytes = self.namespace.total_size(),
            "Filesystem initialized"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        info!("Filesystem unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.resolve(parent) {
            Ok(Node::Root(_)) => {}
            Ok(Node::File(_)) => {
                reply.error(libc::ENOTDIR);
                return;
            }
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        }

        match self.resolve_child(name) {
            Ok(file) => reply.entry(&self.ttl, &self.kernel_attr(file.attributes()), 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.resolve(ino) {
            Ok(node) => reply.attr(&self.ttl, &self.kernel_attr(node.attributes())),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.resolve(ino) {
            Ok(Node::File(_)) => {}
            Ok(Node::Root(_)) => {
                reply.error(libc::EISDIR);
                return;
            }
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        }

        let write_flags = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_TRUNC;
        if flags & write_flags != 0 {
            reply.error(libc::EROFS);
            return;
        }

        // Stateless: every read resolves the inode again
        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        let file = match self.resolve(ino) {
            Ok(Node::File(file)) => file,
            Ok(Node::Root(_)) => {
                reply.error(libc::EISDIR);
                return;
            }
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        match file.read_all() {
            Ok(data) => reply.data(read_window(&data, offset as u64, size)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.resolve(ino) {
            Ok(Node::Root(_)) => reply.opened(0, 0),
            Ok(Node::File(_)) => reply.error(libc::ENOTDIR),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let root = match self.resolve(ino) {
            Ok(Node::Root(root)) => root,
            Ok(Node::File(_)) => {
                reply.error(libc::ENOTDIR);
                return;
            }
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        for (cookie, entry) in directory_stream(root.list_children(), offset as u64) {
            // Buffer full
            if reply.add(entry.ino, cookie, entry.kind.into(), &entry.name) {
                debug!(offset, cookie, "readdir buffer full");
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let total_blocks = self.namespace.total_size().div_ceil(BLOCK_SIZE);
        reply.statfs(
            total_blocks,
            0,
            0,
            self.namespace.len() as u64 + 1,
            0,
            BLOCK_SIZE as u32,
            MAX_NAME_LENGTH,
            BLOCK_SIZE as u32,
        );
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        if let Err(err) = self.resolve(ino) {
            reply.error(err.errno());
            return;
        }
        if mask & libc::W_OK != 0 {
            reply.error(libc::EROFS);
            return;
        }
        reply.ok();
    }
}

/// Bytes a kernel read of `size` bytes at `offset` receives
///
/// An offset at or past the end yields an empty slice.
fn read_window(data: &[u8], offset: u64, size: u32) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let end = start.saturating_add(size as usize).min(data.len());
    &data[start..end]
}

/// Root directory stream resumed after the kernel's `offset` cookie
///
/// `.` and `..` come first. Each entry is paired with the cookie the kernel
/// passes back to continue after it.
fn directory_stream(children: Vec<DirEntry>, offset: u64) -> Vec<(i64, DirEntry)> {
    let dots = [".", ".."].map(|name| DirEntry {
        ino: ROOT_INO,
        name: name.to_string(),
        kind: FileKind::Directory,
    });
    dots.into_iter()
        .chain(children)
        .enumerate()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .map(|(index, entry)| (index as i64 + 1, entry))
        .collect()
}

/// Kernel mount options for a configuration
pub fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName(config.fsname.clone()),
        MountOption::Subtype(config.subtype.clone()),
        MountOption::AutoUnmount,
        MountOption::RO,
        MountOption::NoExec,
        MountOption::DefaultPermissions,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    options
}

/// Mount without serving yet
///
/// `Session::run` serves on the calling thread until the filesystem is
/// unmounted, whether through `Session::unmount_callable` or from outside
/// (`fusermount -u`, `umount`).
pub fn session<P: AsRef<Path>>(
    fs: WarcFs,
    mountpoint: P,
    config: &MountConfig,
) -> io::Result<Session<WarcFs>> {
    Session::new(fs, mountpoint.as_ref(), &mount_options(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Content, Entry};

    fn fs() -> WarcFs {
        let namespace = Namespace::from_entries(vec![Entry {
            ino: 2,
            name: "http:__a_b".to_string(),
            url: "http://a/b".to_string(),
            size: 4,
            content: Content::Materialized(b"abcd".to_vec()),
        }]);
        WarcFs::new(namespace, &MountConfig::default())
    }

    #[test]
    fn test_kernel_attr_conversion() {
        let fs = fs();
        let attr = fs.kernel_attr(fs.namespace().root().attributes());
        assert_eq!(attr.ino, 1);
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.perm, 0o555);

        let file = fs.namespace().root().lookup("http:__a_b").unwrap();
        let attr = fs.kernel_attr(file.attributes());
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.size, 4);
        assert_eq!(attr.blocks, 1);
        assert_eq!(attr.perm, 0o444);
    }

    #[test]
    fn test_missed_lookups_map_to_enoent() {
        let fs = fs();
        let err = fs.resolve(99).err().unwrap();
        assert!(matches!(err, WarcFsError::InodeNotFound(99)));
        assert_eq!(err.errno(), libc::ENOENT);

        let err = fs.resolve_child(OsStr::new("http:__a_c")).err().unwrap();
        assert!(matches!(err, WarcFsError::EntryNotFound(ref name) if name == "http:__a_c"));
        assert_eq!(err.errno(), libc::ENOENT);

        assert!(fs.resolve_child(OsStr::new("http:__a_b")).is_ok());
        assert!(matches!(fs.resolve(ROOT_INO), Ok(Node::Root(_))));
    }

    #[test]
    fn test_errno_values_match_libc() {
        assert_eq!(WarcFsError::InodeNotFound(3).errno(), libc::ENOENT);
        assert_eq!(WarcFsError::Truncated { offset: 0 }.errno(), libc::EIO);
    }

    #[test]
    fn test_read_window() {
        let data = b"abcdefghij";
        assert_eq!(read_window(data, 0, 4), b"abcd");
        assert_eq!(read_window(data, 4, 4), b"efgh");
        // Partial final chunk
        assert_eq!(read_window(data, 8, 4), b"ij");
        assert_eq!(read_window(data, 0, 4096), data);
        // At and past EOF
        assert!(read_window(data, 10, 4).is_empty());
        assert!(read_window(data, 1 << 40, 4).is_empty());
        assert!(read_window(data, u64::MAX, u32::MAX).is_empty());
        assert!(read_window(b"", 0, 4).is_empty());
    }

    fn names(stream: &[(i64, DirEntry)]) -> Vec<&str> {
        stream.iter().map(|(_, entry)| entry.name.as_str()).collect()
    }

    #[test]
    fn test_directory_stream_resumes_from_cookie() {
        let fs = fs();
        let children = fs.namespace().root().list_children();

        let full = directory_stream(children.clone(), 0);
        assert_eq!(names(&full), vec![".", "..", "http:__a_b"]);
        assert_eq!(full.iter().map(|(cookie, _)| *cookie).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(full[0].1.ino, ROOT_INO);
        assert_eq!(full[1].1.kind, FileKind::Directory);
        assert_eq!(full[2].1.ino, 2);
        assert_eq!(full[2].1.kind, FileKind::RegularFile);

        // Each cookie resumes right after the entry it was handed out with
        assert_eq!(names(&directory_stream(children.clone(), 1)), vec!["..", "http:__a_b"]);
        assert_eq!(names(&directory_stream(children.clone(), 2)), vec!["http:__a_b"]);
        assert_eq!(directory_stream(children.clone(), 2)[0].0, 3);
        assert!(directory_stream(children.clone(), 3).is_empty());
        assert!(directory_stream(children, u64::MAX).is_empty());
    }

    #[test]
    fn test_directory_stream_of_empty_root() {
        let stream = directory_stream(Vec::new(), 0);
        assert_eq!(names(&stream), vec![".", ".."]);
        assert!(directory_stream(Vec::new(), 2).is_empty());
    }

    #[test]
    fn test_mount_options() {
        let options = mount_options(&MountConfig::default());
        assert!(options.contains(&MountOption::RO));
        assert!(options.contains(&MountOption::AutoUnmount));
        assert!(options.contains(&MountOption::FSName("warcmount".to_string())));
        assert!(!options.contains(&MountOption::AllowOther));

        let config = MountConfig {
            allow_other: true,
            ..MountConfig::default()
        };
        assert!(mount_options(&config).contains(&MountOption::AllowOther));
    }
}
