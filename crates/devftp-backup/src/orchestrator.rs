//! Backup run: walk, filter, archive, report.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use devftp_core::paths::VCS_DIR_NAME;
use devftp_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::archive::ArchiveBuilder;
use crate::compression::{calculate_checksum, CompressionLevel, DEFAULT_COMPRESSION_LEVEL};
use crate::events::{BackupEvent, BackupSink, BackupStatus};
use crate::filters::ExclusionSet;
use crate::walker::{self, EntryKind, TreeEntry, WalkError};

/// Inputs of one backup run
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Directory tree to back up
    pub source_dir: PathBuf,

    /// Caller-supplied exclusions; the VCS directory and the output
    /// directory are always added on top
    pub exclusions: ExclusionSet,

    /// Raw level, validated before anything touches the disk
    pub compression_level: i64,

    /// Archive to create
    pub output_path: PathBuf,
}

impl BackupRequest {
    pub fn new(source_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            exclusions: ExclusionSet::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL as i64,
            output_path: output_path.into(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level;
        self
    }

    /// Directory the archive is written to
    pub fn output_dir(&self) -> PathBuf {
        match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Caller exclusions merged with the always-excluded directories
    pub fn effective_exclusions(&self) -> ExclusionSet {
        self.exclusions
            .with_implicit(&self.source_dir.join(VCS_DIR_NAME), &self.output_dir())
    }
}

/// Outcome of a backup run that got as far as opening the archive
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub output_path: PathBuf,
    pub entries_added: u64,
    pub entries_failed: u64,
    pub entries_excluded: u64,

    /// Size of the unfiltered tree at the start of the run
    pub total_entries: u64,

    pub status: BackupStatus,
    pub compression_level: CompressionLevel,

    /// Archive size, absent when the archive is unusable
    pub size_bytes: Option<u64>,

    /// SHA256 of the archive, absent when the archive is unusable
    pub checksum: Option<String>,

    pub duration: Duration,
}

impl BackupResult {
    pub fn is_success(&self) -> bool {
        self.status == BackupStatus::Success
    }
}

/// Runs one backup from validation through finalization.
pub struct BackupOrchestrator {
    request: BackupRequest,
}

impl BackupOrchestrator {
    pub fn new(request: BackupRequest) -> Self {
        Self { request }
    }

    /// Runs the backup, reporting to `sink`.
    ///
    /// Returns `Err` only when the run could not start: an invalid
    /// compression level or source directory (`InvalidConfig`, nothing
    /// created) or an output directory/file that cannot be created
    /// (`Create`). Once the archive is open the run always finalizes it and
    /// returns a [`BackupResult`], with per-entry failures counted rather
    /// than propagated.
    pub fn run<S: BackupSink + ?Sized>(&self, sink: &mut S) -> Result<BackupResult> {
        let started = Instant::now();
        let request = &self.request;

        // ValidatingConfig
        let level = CompressionLevel::new(request.compression_level)?;
        if !request.source_dir.is_dir() {
            return Err(Error::invalid_config(format!(
                "Source directory does not exist: {}",
                request.source_dir.display()
            )));
        }

        // CreatingOutput
        let output_dir = request.output_dir();
        fs::create_dir_all(&output_dir).map_err(|e| Error::create(&output_dir, e))?;
        let mut archive = ArchiveBuilder::open(&request.output_path)?;
        archive.set_compression_level(level);

        let exclusions = request.effective_exclusions();
        debug!("Exclusions: {:?}", exclusions.prefixes());

        // Walking
        let total = walker::count(&request.source_dir);
        info!(
            "Backup started: {} -> {} ({} entries, level {})",
            request.source_dir.display(),
            request.output_path.display(),
            total,
            level
        );
        sink.on_event(&BackupEvent::Started {
            output_path: request.output_path.clone(),
            total_entries: total,
        });

        let mut tally = Tally::default();
        for item in walker::walk(&request.source_dir) {
            match item {
                Ok(entry) => {
                    if exclusions.is_excluded(&entry.absolute_path) {
                        tally.excluded += 1;
                    } else {
                        add_entry(&mut archive, &entry, &mut tally, sink);
                    }
                }
                Err(err) => {
                    let excluded = err
                        .path
                        .as_deref()
                        .is_some_and(|p| exclusions.is_excluded(p));
                    if excluded {
                        tally.excluded += 1;
                    } else {
                        report_walk_error(&err, &mut tally, sink);
                    }
                }
            }

            tally.visited += 1;
            sink.on_event(&BackupEvent::Progress {
                visited: tally.visited,
                total: total.max(tally.visited),
            });
        }

        // Finalizing
        let output_path = request.output_path.clone();
        let status = match archive.close() {
            Ok(()) if tally.failed == 0 => BackupStatus::Success,
            Ok(()) => BackupStatus::PartialFailure,
            Err(e) => {
                warn!("{}", e);
                sink.on_event(&BackupEvent::FinalizeFailed {
                    message: e.to_string(),
                });
                BackupStatus::Fatal
            }
        };

        let (size_bytes, checksum) = if status.is_usable() {
            archive_fingerprint(&output_path)
        } else {
            (None, None)
        };

        info!(
            "Backup finished with {}: {} added, {} failed, {} excluded",
            status, tally.added, tally.failed, tally.excluded
        );
        sink.on_event(&BackupEvent::Completed {
            status,
            entries_added: tally.added,
            entries_failed: tally.failed,
        });

        Ok(BackupResult {
            output_path,
            entries_added: tally.added,
            entries_failed: tally.failed,
            entries_excluded: tally.excluded,
            total_entries: total,
            status,
            compression_level: level,
            size_bytes,
            checksum,
            duration: started.elapsed(),
        })
    }
}

/// Convenience wrapper around [`BackupOrchestrator::run`].
pub fn run<S: BackupSink + ?Sized>(request: BackupRequest, sink: &mut S) -> Result<BackupResult> {
    BackupOrchestrator::new(request).run(sink)
}

#[derive(Debug, Default)]
struct Tally {
    visited: u64,
    added: u64,
    failed: u64,
    excluded: u64,
}

fn add_entry<S: BackupSink + ?Sized>(
    archive: &mut ArchiveBuilder,
    entry: &TreeEntry,
    tally: &mut Tally,
    sink: &mut S,
) {
    let result = match entry.kind {
        EntryKind::Directory => archive.add_directory(&entry.absolute_path, &entry.archive_path),
        EntryKind::File => archive.add_file(&entry.absolute_path, &entry.archive_path),
    };

    match result {
        Ok(()) => {
            tally.added += 1;
            debug!("Added {}: {}", entry.kind, entry.relative_path);
            sink.on_event(&BackupEvent::EntryAdded {
                relative_path: entry.relative_path.clone(),
                kind: entry.kind,
            });
        }
        Err(e) => {
            tally.failed += 1;
            warn!("Failed to add {}: {}", entry.kind, e);
            sink.on_event(&BackupEvent::EntryFailed {
                relative_path: entry.relative_path.clone(),
                kind: Some(entry.kind),
                message: e.to_string(),
            });
        }
    }
}

fn report_walk_error<S: BackupSink + ?Sized>(err: &WalkError, tally: &mut Tally, sink: &mut S) {
    tally.failed += 1;
    warn!("Failed to read entry: {}", err);
    sink.on_event(&BackupEvent::EntryFailed {
        relative_path: err.relative_path.clone(),
        kind: None,
        message: err.message.clone(),
    });
}

fn archive_fingerprint(path: &Path) -> (Option<u64>, Option<String>) {
    let size = fs::metadata(path).map(|m| m.len()).ok();
    let checksum = match calculate_checksum(path) {
        Ok(sum) => Some(sum),
        Err(e) => {
            warn!("Failed to checksum {}: {}", path.display(), e);
            None
        }
    };
    (size, checksum)
}
