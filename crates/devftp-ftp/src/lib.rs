//! devftp FTP upload
//!
//! A small blocking FTP client (RFC 959, passive mode, binary type) and the
//! [`Uploader`] that sends one local file to the configured remote
//! directory.
//!
//! - `protocol` - control-channel reply parsing and command encoding
//! - `client` - connection, login and STOR over a passive data connection
//! - `uploader` - config validation and error mapping for a single upload

pub mod client;
pub mod protocol;
pub mod uploader;

pub use client::{ClientError, ClientResult, FtpClient};
pub use protocol::{parse_pasv, Reply};
pub use uploader::{upload, UploadReport, Uploader};
