//! Single-file upload to the configured FTP directory

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use devftp_core::{Error, Result, UploadConfig};
use tracing::{debug, info, warn};

use crate::client::FtpClient;

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub bytes: u64,
    pub duration: Duration,
}

/// Uploads files with one fixed configuration
#[derive(Debug, Clone)]
pub struct Uploader {
    config: UploadConfig,
}

impl Uploader {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Uploads `file` to `<remote_root>/<file name>` in passive binary mode.
    ///
    /// The file and the configuration are checked before any connection is
    /// made. A single attempt is made; the first failing step aborts with
    /// `Connection`, `Auth` or `Transfer`.
    pub fn upload(&self, file: &Path) -> Result<UploadReport> {
        if !file.is_file() {
            return Err(Error::FileNotFound {
                path: file.to_path_buf(),
            });
        }
        self.config.validate()?;

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::FileNotFound {
                path: file.to_path_buf(),
            })?;
        let remote_path = self.config.remote_path(&file_name);
        let mut source = BufReader::new(File::open(file)?);

        let started = Instant::now();
        let host = self.config.host.as_str();
        info!(
            "Uploading {} to {}:{}{}",
            file.display(),
            host,
            self.config.port,
            remote_path
        );

        let mut client = FtpClient::connect(host, self.config.port, self.config.timeout())
            .map_err(|e| Error::connection(host, e))?;

        client
            .login(&self.config.username, &self.config.password)
            .map_err(|e| Error::auth(host, e))?;

        client
            .set_binary()
            .map_err(|e| Error::transfer(remote_path.as_str(), e))?;
        let bytes = client
            .store(&remote_path, &mut source)
            .map_err(|e| Error::transfer(remote_path.as_str(), e))?;

        if let Err(e) = client.quit() {
            warn!("FTP QUIT failed after upload: {}", e);
        }

        let duration = started.elapsed();
        debug!("Uploaded {} bytes in {:?}", bytes, duration);
        Ok(UploadReport {
            local_path: file.to_path_buf(),
            remote_path,
            bytes,
            duration,
        })
    }
}

/// Convenience wrapper around [`Uploader::upload`].
pub fn upload(file: &Path, config: &UploadConfig) -> Result<UploadReport> {
    Uploader::new(config.clone()).upload(file)
}
