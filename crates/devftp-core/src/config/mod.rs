//! Upload configuration loading and validation

mod loader;
mod upload;

pub use loader::{
    UploadConfigLoader, ENV_HOST, ENV_PASSWORD, ENV_PORT, ENV_ROOT, ENV_TIMEOUT_SECS,
    ENV_USERNAME,
};
pub use upload::{UploadConfig, DEFAULT_FTP_PORT, DEFAULT_TIMEOUT_SECS};
