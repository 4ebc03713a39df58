//! Append-only operation log
//!
//! Backup and upload each keep a line-oriented log under
//! `storage/app/devftp/`. Every line has the shape
//! `[YYYY-MM-DD HH:MM:SS] LEVEL: message` and is flushed as soon as it is
//! written, so a crashed run still leaves its trail behind.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::warn;

use crate::error::Result;

/// Timestamp format of a log line
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity written into a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Writes `[timestamp] LEVEL: message` lines to a single file
#[derive(Debug, Clone)]
pub struct OperationLog {
    path: PathBuf,
}

impl OperationLog {
    /// Create a log writing to `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an INFO line
    pub fn info(&self, message: impl AsRef<str>) {
        self.record(LogLevel::Info, message.as_ref());
    }

    /// Append an ERROR line
    pub fn error(&self, message: impl AsRef<str>) {
        self.record(LogLevel::Error, message.as_ref());
    }

    /// Append a line, reporting write failures through tracing only
    ///
    /// A log that cannot be written never changes the outcome of the
    /// operation being logged.
    pub fn record(&self, level: LogLevel, message: &str) {
        if let Err(e) = self.append(level, message, Local::now()) {
            warn!("Failed to write {}: {}", self.path.display(), e);
        }
    }

    /// Append a line with an explicit timestamp
    pub fn append(&self, level: LogLevel, message: &str, at: DateTime<Local>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{}", format_line(level, message, &at))?;
        file.flush()?;

        Ok(())
    }
}

/// Render one log line without the trailing newline
pub fn format_line(level: LogLevel, message: &str, at: &DateTime<Local>) -> String {
    format!("[{}] {}: {}", at.format(LOG_TIMESTAMP_FORMAT), level, message)
}
