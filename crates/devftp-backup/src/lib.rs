//! devftp backup system
//!
//! This crate turns a project directory into a single timestamped
//! `tar.gz` archive.
//!
//! # Features
//!
//! - **Pre-order walk**: directories before their children, siblings sorted
//! - **Prefix exclusions**: segment-aligned path prefixes, with the VCS
//!   directory and the backup directory always excluded
//! - **Streaming compression**: entries go straight into a gzip stream at a
//!   configurable level (0 = store, 9 = smallest)
//! - **Forward progress**: an unreadable entry is counted and reported, the
//!   run carries on
//! - **Event sink**: progress and per-entry outcomes are pushed to a
//!   [`BackupSink`]
//!
//! # Examples
//!
//! ```no_run
//! use devftp_backup::{BackupRequest, ExclusionSet, NullSink};
//!
//! fn main() -> devftp_core::Result<()> {
//!     let request = BackupRequest::new("/srv/app", "/srv/app/storage/app/devftp/backup/now.tar.gz")
//!         .with_exclusions(ExclusionSet::new(["/srv/app/node_modules"]))
//!         .with_compression_level(9);
//!
//!     let result = devftp_backup::run(request, &mut NullSink)?;
//!     println!("{}: {} entries added", result.status, result.entries_added);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod compression;
pub mod events;
pub mod filters;
pub mod orchestrator;
pub mod progress;
pub mod walker;

// Re-export commonly used types
pub use archive::ArchiveBuilder;
pub use compression::{
    calculate_checksum, CompressionLevel, DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL,
};
pub use events::{BackupEvent, BackupSink, BackupStatus, NullSink};
pub use filters::{is_excluded, normalize, ExclusionSet};
pub use orchestrator::{run, BackupOrchestrator, BackupRequest, BackupResult};
pub use progress::BackupProgress;
pub use walker::{walk, EntryKind, TreeEntry, TreeWalk, WalkError};
