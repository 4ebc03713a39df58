//! Project path layout
//!
//! Everything devftp writes lives under `<root>/storage/app/devftp/`:
//!
//! ```text
//! storage/app/devftp/
//! ├── backup/              # YYYY-MM-DD_HH-MM-SS.tar.gz archives
//! ├── backup.log
//! └── upload.log
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

/// File extension of backup archives
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Timestamp format used in archive file names
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Version-control metadata directory, always excluded from backups
pub const VCS_DIR_NAME: &str = ".git";

/// Default upload config file name, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "devftp.yaml";

/// Resolves every path devftp reads or writes relative to a project root
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Create paths for the given project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root (backup source)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `storage/app/devftp`
    pub fn storage_dir(&self) -> PathBuf {
        self.root.join("storage").join("app").join("devftp")
    }

    /// Directory holding backup archives
    pub fn backup_dir(&self) -> PathBuf {
        self.storage_dir().join("backup")
    }

    /// Log file for backup runs
    pub fn backup_log(&self) -> PathBuf {
        self.storage_dir().join("backup.log")
    }

    /// Log file for uploads
    pub fn upload_log(&self) -> PathBuf {
        self.storage_dir().join("upload.log")
    }

    /// Version-control metadata directory
    pub fn vcs_dir(&self) -> PathBuf {
        self.root.join(VCS_DIR_NAME)
    }

    /// Default upload config file
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Resolve a user-supplied path against the project root
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Archive path for a run started at `started_at`
    ///
    /// Appends `_1`, `_2`, ... when a file with the timestamp name already
    /// exists, so runs within the same second never share an output file.
    pub fn backup_file<Tz>(&self, started_at: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let stem = started_at.format(ARCHIVE_TIMESTAMP_FORMAT).to_string();
        let dir = self.backup_dir();

        let candidate = dir.join(format!("{}.{}", stem, ARCHIVE_EXTENSION));
        if !candidate.exists() {
            return candidate;
        }

        (1u32..)
            .map(|n| dir.join(format!("{}_{}.{}", stem, n, ARCHIVE_EXTENSION)))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}
