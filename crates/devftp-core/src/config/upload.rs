//! FTP upload configuration record

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Standard FTP control port
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Connect/read/write timeout applied to both FTP connections
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the FTP upload
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    /// Remote directory uploads land in
    #[serde(rename = "root")]
    pub remote_root: String,
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            port: DEFAULT_FTP_PORT,
            remote_root: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl UploadConfig {
    /// Names of required fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.username.is_empty() {
            missing.push("username");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if self.port == 0 {
            missing.push("port");
        }
        if self.remote_root.trim().is_empty() {
            missing.push("root");
        }
        missing
    }

    /// Fail with `InvalidConfig` unless every required field is set
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_config(format!(
                "Incomplete FTP configuration, missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// Remote path for a file with the given base name
    ///
    /// Trailing slashes of the remote root are trimmed before joining.
    pub fn remote_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.remote_root.trim_end_matches('/'), file_name)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// Keeps the password out of logs and panics
impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .field("remote_root", &self.remote_root)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
