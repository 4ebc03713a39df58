//! Upload configuration loader with precedence
//!
//! Loads configuration from the following sources (low to high):
//! 1. Built-in defaults (port 21, 30 second timeout)
//! 2. Config file (`<root>/devftp.yaml`, `ftp:` section), if present
//! 3. Environment variables (`FTP_*`)
//!
//! The loader does not validate completeness; callers decide when an
//! incomplete record is an error (see [`UploadConfig::validate`]).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::upload::UploadConfig;
use crate::error::{Error, Result};

pub const ENV_HOST: &str = "FTP_HOST";
pub const ENV_USERNAME: &str = "FTP_USERNAME";
pub const ENV_PASSWORD: &str = "FTP_PASSWORD";
pub const ENV_PORT: &str = "FTP_PORT";
pub const ENV_ROOT: &str = "FTP_ROOT";
pub const ENV_TIMEOUT_SECS: &str = "FTP_TIMEOUT_SECS";

/// On-disk shape of the config file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ftp: FtpSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FtpSection {
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    port: Option<u16>,
    root: Option<String>,
    #[serde(alias = "timeout_secs")]
    timeout_secs: Option<u64>,
}

/// Builds an [`UploadConfig`] from file and environment
#[derive(Debug, Clone)]
pub struct UploadConfigLoader {
    config_file: PathBuf,
}

impl UploadConfigLoader {
    /// Create a loader reading the given config file (which may not exist)
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    /// Path of the config file consulted
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Load the upload configuration with file and environment precedence
    pub fn load(&self) -> Result<UploadConfig> {
        let mut config = UploadConfig::default();

        if self.config_file.exists() {
            debug!("Loading upload config from {}", self.config_file.display());
            let section = self.load_file()?;
            config = Self::merge_section(config, section);
        }

        Self::apply_env_overrides(config)
    }

    fn load_file(&self) -> Result<FtpSection> {
        let content = fs::read_to_string(&self.config_file)?;
        if content.trim().is_empty() {
            return Ok(FtpSection::default());
        }

        let file: ConfigFile = serde_yaml_ng::from_str(&content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse {}: {}",
                self.config_file.display(),
                e
            ))
        })?;
        Ok(file.ftp)
    }

    /// Overlay the fields present in the file section
    fn merge_section(mut base: UploadConfig, section: FtpSection) -> UploadConfig {
        if let Some(host) = section.host {
            base.host = host;
        }
        if let Some(username) = section.username {
            base.username = username;
        }
        if let Some(password) = section.password {
            base.password = password;
        }
        if let Some(port) = section.port {
            base.port = port;
        }
        if let Some(root) = section.root {
            base.remote_root = root;
        }
        if let Some(timeout) = section.timeout_secs {
            base.timeout_secs = timeout;
        }
        base
    }

    /// Apply `FTP_*` environment variable overrides
    fn apply_env_overrides(mut config: UploadConfig) -> Result<UploadConfig> {
        if let Ok(val) = env::var(ENV_HOST) {
            config.host = val;
        }

        if let Ok(val) = env::var(ENV_USERNAME) {
            config.username = val;
        }

        if let Ok(val) = env::var(ENV_PASSWORD) {
            config.password = val;
        }

        if let Ok(val) = env::var(ENV_PORT) {
            config.port = val
                .trim()
                .parse()
                .map_err(|_| Error::invalid_config("FTP_PORT must be a valid port number"))?;
        }

        if let Ok(val) = env::var(ENV_ROOT) {
            config.remote_root = val;
        }

        if let Ok(val) = env::var(ENV_TIMEOUT_SECS) {
            config.timeout_secs = val
                .trim()
                .parse()
                .map_err(|_| Error::invalid_config("FTP_TIMEOUT_SECS must be a valid number"))?;
        }

        Ok(config)
    }
}
