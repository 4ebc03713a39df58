//! Events emitted during a backup run.
//!
//! The orchestrator reports everything it does through a [`BackupSink`];
//! the CLI turns events into log lines and a progress bar, tests collect
//! them into a `Vec`.

use std::path::PathBuf;

use crate::walker::EntryKind;

/// Final state of a backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    /// Every entry was archived and the archive was finalized
    Success,
    /// Archive finalized, but at least one entry could not be added
    PartialFailure,
    /// Archive could not be finalized; the output file is unusable
    Fatal,
}

impl BackupStatus {
    /// Whether the archive on disk can be used
    pub fn is_usable(self) -> bool {
        !matches!(self, BackupStatus::Fatal)
    }
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupStatus::Success => write!(f, "success"),
            BackupStatus::PartialFailure => write!(f, "partial failure"),
            BackupStatus::Fatal => write!(f, "fatal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupEvent {
    /// Archive opened, walk about to begin
    Started {
        output_path: PathBuf,
        /// Size of the unfiltered tree
        total_entries: u64,
    },
    EntryAdded {
        relative_path: String,
        kind: EntryKind,
    },
    EntryFailed {
        relative_path: String,
        /// Kind of the entry, unknown when it could not be inspected
        kind: Option<EntryKind>,
        message: String,
    },
    /// One tick per walked entry, excluded entries included
    Progress { visited: u64, total: u64 },
    FinalizeFailed { message: String },
    Completed {
        status: BackupStatus,
        entries_added: u64,
        entries_failed: u64,
    },
}

/// Receives backup events in order
pub trait BackupSink {
    fn on_event(&mut self, event: &BackupEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl BackupSink for NullSink {
    fn on_event(&mut self, _event: &BackupEvent) {}
}

/// Collects events, mostly for inspection in tests
impl BackupSink for Vec<BackupEvent> {
    fn on_event(&mut self, event: &BackupEvent) {
        self.push(event.clone());
    }
}

impl<S: BackupSink + ?Sized> BackupSink for &mut S {
    fn on_event(&mut self, event: &BackupEvent) {
        (**self).on_event(event);
    }
}
