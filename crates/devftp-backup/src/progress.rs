//! Progress reporting for backup runs.
//!
//! Provides visual feedback during long-running backups. The bar length is
//! the size of the unfiltered tree, and it advances once per walked entry.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::events::{BackupEvent, BackupSink};

/// Progress bar driven by backup events.
#[derive(Debug, Clone)]
pub struct BackupProgress {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl BackupProgress {
    /// Creates a progress reporter drawing to stderr.
    pub fn new() -> Self {
        Self {
            bar: None,
            hidden: false,
        }
    }

    /// Creates a reporter that tracks position but never draws.
    pub fn hidden() -> Self {
        Self {
            bar: None,
            hidden: true,
        }
    }

    /// Starts the archive phase with a known entry count.
    pub fn start(&mut self, total_entries: u64, message: &str) {
        let bar = ProgressBar::new(total_entries);
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.to_string());
        self.bar = Some(bar);
    }

    /// Moves the bar to `visited`, growing it if the tree grew mid-run.
    pub fn set_position(&self, visited: u64, total: u64) {
        if let Some(bar) = &self.bar {
            if bar.length() != Some(total) {
                bar.set_length(total);
            }
            bar.set_position(visited);
        }
    }

    /// Current position, 0 before [`BackupProgress::start`].
    pub fn position(&self) -> u64 {
        self.bar.as_ref().map(|b| b.position()).unwrap_or(0)
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.as_ref().and_then(|b| b.length())
    }

    /// Finishes the bar with a final message.
    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    /// Finishes and clears the bar.
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Default for BackupProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupSink for BackupProgress {
    fn on_event(&mut self, event: &BackupEvent) {
        match event {
            BackupEvent::Started { total_entries, .. } => {
                self.start(*total_entries, "Creating archive...")
            }
            BackupEvent::Progress { visited, total } => self.set_position(*visited, *total),
            BackupEvent::Completed { status, .. } => self.finish(&format!("Backup {}", status)),
            _ => {}
        }
    }
}
