//! Upload command

use anyhow::{anyhow, Result};
use camino::Utf8PathBuf;
use clap::Args;
use devftp_core::{Error, OperationLog, UploadConfigLoader};
use devftp_ftp::Uploader;

use super::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload, relative to the project root
    #[arg(short, long)]
    pub file: Option<Utf8PathBuf>,
}

pub fn run(args: UploadArgs, ctx: &Context) -> Result<()> {
    let log = OperationLog::new(ctx.paths.upload_log());

    let file = match args.file.filter(|f| !f.as_str().trim().is_empty()) {
        Some(file) => ctx.paths.resolve(file),
        None => {
            log.error("File path is required.");
            return Err(anyhow!("File path is required. Pass it with --file <PATH>"));
        }
    };

    if !file.is_file() {
        log.error(format!("File does not exist: {}", file.display()));
        return Err(Error::FileNotFound { path: file }.into());
    }

    let config = match UploadConfigLoader::new(&ctx.config_file).load() {
        Ok(config) => config,
        Err(e) => {
            log.error(e.to_string());
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        log.error("Incomplete FTP configuration.");
        return Err(e.into());
    }

    let remote_root = config.remote_root.clone();
    let host = config.host.clone();
    if !ctx.quiet {
        output::header("FTP Upload");
        output::kv("File", &file.display().to_string());
        output::kv("Server", &format!("{}:{}", host, config.port));
        output::kv("Remote directory", &remote_root);
        println!();
    }

    let spinner = (!ctx.quiet).then(|| output::spinner("Uploading..."));
    let outcome = Uploader::new(config).upload(&file);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match outcome {
        Ok(report) => {
            log.info("File uploaded to FTP successfully.");
            if !ctx.quiet {
                output::success("File uploaded to FTP successfully");
                output::kv("Remote path", &report.remote_path);
                output::kv("Size", &output::format_bytes(report.bytes));
                output::kv("Duration", &format!("{:.1}s", report.duration.as_secs_f64()));
            }
            Ok(())
        }
        Err(e) => {
            log.error(failure_line(&e));
            Err(e.into())
        }
    }
}

/// Upload log line for a failed upload
fn failure_line(error: &Error) -> String {
    match error {
        Error::Connection { host, .. } => format!("Failed to connect to FTP server: {}", host),
        Error::Auth { host, .. } => format!("Failed to login to FTP server: {}", host),
        Error::Transfer { remote_path, .. } => {
            format!("Failed to upload file to FTP: {}", remote_path)
        }
        Error::FileNotFound { path } => format!("File does not exist: {}", path.display()),
        Error::InvalidConfig { .. } => "Incomplete FTP configuration.".to_string(),
        other => format!("Failed to upload file to FTP. {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_lines() {
        assert_eq!(
            failure_line(&Error::connection("ftp.example.com", "refused")),
            "Failed to connect to FTP server: ftp.example.com"
        );
        assert_eq!(
            failure_line(&Error::auth("ftp.example.com", "530 Login incorrect")),
            "Failed to login to FTP server: ftp.example.com"
        );
        assert_eq!(
            failure_line(&Error::transfer("/backups/a.tar.gz", "553 denied")),
            "Failed to upload file to FTP: /backups/a.tar.gz"
        );
        assert_eq!(
            failure_line(&Error::invalid_config("missing host")),
            "Incomplete FTP configuration."
        );
    }
}
