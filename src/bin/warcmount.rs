//! Mount a WARC archive as a read-only directory.
//!
//! Usage:
//!   warcmount crawl.warc.gz                 # mounts at ./crawl
//!   warcmount crawl.warc --mountpoint /mnt/crawl --lazy
//!   RUST_LOG=debug warcmount crawl.warc.gz
//!
//! Ctrl-C (or SIGTERM/SIGHUP) unmounts; so does `fusermount -u` from outside.

use anyhow::{Context, Result};
use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::path::PathBuf;
use std::thread;
use tracing_subscriber::{fmt, EnvFilter};

use warcfs_rs::fuse::{self, WarcFs};
use warcfs_rs::{default_mountpoint, Materialization, MountConfig, Namespace};

/// Mount a WARC archive as a read-only directory.
#[derive(Parser, Debug)]
#[command(name = "warcmount")]
#[command(about = "Mount a WARC web archive as a read-only directory")]
struct Args {
    /// WARC file (.warc or .warc.gz)
    archive: PathBuf,

    /// Directory to mount on (default: archive name without extensions)
    #[arg(short, long)]
    mountpoint: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Re-read payloads from the archive instead of holding them in memory
    #[arg(long)]
    lazy: bool,

    /// Expose `response` payloads with their HTTP headers
    #[arg(long)]
    keep_http_headers: bool,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MountConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MountConfig::default(),
    };
    if args.lazy {
        config.materialization = Materialization::Lazy;
    }
    if args.keep_http_headers {
        config.strip_http_headers = false;
    }

    let namespace = Namespace::open(&args.archive, &config)
        .with_context(|| format!("failed to index {}", args.archive.display()))?;

    let mountpoint = match args.mountpoint {
        Some(dir) => dir,
        None => default_mountpoint(&args.archive).with_context(|| {
            format!("cannot derive a mount point from {}", args.archive.display())
        })?,
    };
    let created = !mountpoint.exists();
    std::fs::create_dir_all(&mountpoint)
        .with_context(|| format!("failed to create mount point {}", mountpoint.display()))?;

    // Registered before mounting so an early ctrl-c still reaches the cleanup below
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    let signals_handle = signals.handle();

    println!(
        "Mounting {} at {}, use ctrl-c to unmount",
        args.archive.display(),
        mountpoint.display()
    );

    let served = fuse::session(WarcFs::new(namespace, &config), &mountpoint, &config).and_then(
        |mut session| {
            let mut unmounter = session.unmount_callable();
            let watcher = thread::spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    tracing::info!(signal, "Unmounting");
                    if let Err(err) = unmounter.unmount() {
                        tracing::warn!(error = %err, "Unmount failed");
                    }
                }
            });

            // Returns on signal-driven and external unmounts alike
            let served = session.run();
            signals_handle.close();
            if watcher.join().is_err() {
                tracing::warn!("Signal thread panicked");
            }
            served
        },
    );
    if let Err(err) = served {
        tracing::error!(error = %err, mountpoint = %mountpoint.display(), "Serving failed");
    }

    if created {
        if let Err(err) = std::fs::remove_dir(&mountpoint) {
            tracing::warn!(error = %err, mountpoint = %mountpoint.display(), "Failed to remove mount point");
        }
    }

    // Serving never ends in success; the mount only stops when unmounted
    std::process::exit(1);
}
