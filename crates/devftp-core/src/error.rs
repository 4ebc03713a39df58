//! Error types for devftp-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using devftp-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the backup and upload flows
#[derive(Error, Debug)]
pub enum Error {
    /// Bad compression level or incomplete upload configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Backup directory or output container could not be created
    #[error("Failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single directory or file could not be added to the archive
    #[error("Failed to add {path}: {message}")]
    Entry { path: String, message: String },

    /// The archive could not be finalized; the output file is unusable
    #[error("Failed to finalize archive: {message}")]
    Finalize { message: String },

    /// Local file to upload does not exist
    #[error("File does not exist: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// FTP server unreachable or greeting rejected
    #[error("Failed to connect to FTP server {host}: {message}")]
    Connection { host: String, message: String },

    /// FTP server rejected the credentials
    #[error("Failed to login to FTP server {host}: {message}")]
    Auth { host: String, message: String },

    /// FTP transfer failed after login
    #[error("Failed to upload file to FTP {remote_path}: {message}")]
    Transfer {
        remote_path: String,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a create error for the given path
    pub fn create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Create {
            path: path.into(),
            source,
        }
    }

    /// Create a per-entry error
    pub fn entry(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Entry {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a finalize error
    pub fn finalize(message: impl std::fmt::Display) -> Self {
        Self::Finalize {
            message: message.to_string(),
        }
    }

    /// Create a connection error
    pub fn connection(host: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Connection {
            host: host.into(),
            message: message.to_string(),
        }
    }

    /// Create an authentication error
    pub fn auth(host: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Auth {
            host: host.into(),
            message: message.to_string(),
        }
    }

    /// Create a transfer error
    pub fn transfer(remote_path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transfer {
            remote_path: remote_path.into(),
            message: message.to_string(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
