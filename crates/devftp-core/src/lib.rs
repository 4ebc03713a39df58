//! # devftp-core
//!
//! Core library for the devftp CLI providing:
//! - The error taxonomy shared by the backup and upload crates
//! - Project path layout (backup directory, log files)
//! - Upload configuration loading (YAML file + `FTP_*` environment overrides)
//! - Append-only operation logs

pub mod config;
pub mod error;
pub mod log_file;
pub mod paths;

pub use config::{UploadConfig, UploadConfigLoader};
pub use error::{Error, Result};
pub use log_file::{LogLevel, OperationLog};
pub use paths::ProjectPaths;
