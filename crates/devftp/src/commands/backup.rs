//! Backup command

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use camino::Utf8PathBuf;
use chrono::Local;
use clap::Args;
use devftp_backup::{
    BackupEvent, BackupProgress, BackupRequest, BackupResult, BackupSink, BackupStatus,
    CompressionLevel, ExclusionSet,
};
use devftp_core::{Error, OperationLog};

use super::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Paths to leave out, relative to the project root (repeatable, comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<Utf8PathBuf>,

    /// Compression level (0 = store only, 9 = smallest)
    #[arg(long, default_value_t = 7, allow_negative_numbers = true)]
    pub compression: i64,
}

pub fn run(args: BackupArgs, ctx: &Context) -> Result<()> {
    let paths = &ctx.paths;
    let log = OperationLog::new(paths.backup_log());
    let output_path = paths.backup_file(&Local::now());

    let exclusions = ExclusionSet::new(args.exclude.iter().map(|p| paths.resolve(p)));
    let request = BackupRequest::new(paths.root(), &output_path)
        .with_exclusions(exclusions)
        .with_compression_level(args.compression);

    if !ctx.quiet {
        output::header("Project Backup");
        output::kv("Source", &paths.root().display().to_string());
        output::kv("Output", &output_path.display().to_string());
        output::kv("Compression", &args.compression.to_string());
        if !args.exclude.is_empty() {
            let list: Vec<&str> = args.exclude.iter().map(|p| p.as_str()).collect();
            output::kv("Excluded", &list.join(", "));
        }
        println!();
    }

    let progress = if ctx.quiet {
        BackupProgress::hidden()
    } else {
        BackupProgress::new()
    };
    let mut sink = LogSink {
        log: &log,
        progress,
        output_path: output_path.clone(),
    };

    let result = match devftp_backup::run(request, &mut sink) {
        Ok(result) => result,
        Err(e) => {
            log.error(startup_failure(&e, &args, &output_path));
            return Err(e.into());
        }
    };

    check_status(&result, log.path())?;

    if !ctx.quiet {
        println!();
        output::success("Backup created successfully");
        println!();
        output::kv("Location", &result.output_path.display().to_string());
        output::kv(
            "Entries",
            &format!(
                "{} added, {} failed, {} excluded",
                result.entries_added, result.entries_failed, result.entries_excluded
            ),
        );
        if let Some(size) = result.size_bytes {
            output::kv("Size", &output::format_bytes(size));
        }
        if let Some(checksum) = &result.checksum {
            output::kv("SHA256", checksum);
        }
        output::kv("Duration", &format!("{:.1}s", result.duration.as_secs_f64()));
        println!();
        output::info("Upload with:");
        println!("  devftp upload --file {}", result.output_path.display());
    }

    Ok(())
}

/// Fails the command when the archive is unusable.
///
/// Failed entries only earn a warning: the archive is still valid.
fn check_status(result: &BackupResult, log_path: &Path) -> Result<()> {
    match result.status {
        BackupStatus::Fatal => bail!(
            "Failed to finalize the backup; {} is unusable (see {})",
            result.output_path.display(),
            log_path.display()
        ),
        BackupStatus::PartialFailure => output::warning(&format!(
            "{} entries could not be added (see {})",
            result.entries_failed,
            log_path.display()
        )),
        BackupStatus::Success => {}
    }
    Ok(())
}

/// Log line for a run that stopped before the archive was opened
fn startup_failure(error: &Error, args: &BackupArgs, output_path: &Path) -> String {
    match error {
        Error::InvalidConfig { .. } if CompressionLevel::new(args.compression).is_err() => {
            "Invalid compression level.".to_string()
        }
        Error::Create { path, .. } if path == output_path => {
            format!("Failed to create backup file: {}", output_path.display())
        }
        Error::Create { .. } => "Failed to create backup directory.".to_string(),
        other => other.to_string(),
    }
}

/// Writes backup events to the backup log and drives the progress bar
struct LogSink<'a> {
    log: &'a OperationLog,
    progress: BackupProgress,
    output_path: PathBuf,
}

impl BackupSink for LogSink<'_> {
    fn on_event(&mut self, event: &BackupEvent) {
        match event {
            BackupEvent::Started { .. } => self.log.info("Backup started."),
            BackupEvent::EntryAdded {
                relative_path,
                kind,
            } => self.log.info(format!("Added {}: {}", kind, relative_path)),
            BackupEvent::EntryFailed {
                relative_path,
                kind,
                message,
            } => {
                let kind = match kind {
                    Some(kind) => kind.to_string(),
                    None => "entry".to_string(),
                };
                self.log.error(format!(
                    "Failed to add {}: {} ({})",
                    kind, relative_path, message
                ));
            }
            BackupEvent::FinalizeFailed { .. } => self.log.error("Failed to finalize the backup."),
            BackupEvent::Completed { status, .. } => {
                if status.is_usable() {
                    self.log.info(format!(
                        "Backup created successfully: {}",
                        self.output_path.display()
                    ));
                }
                self.log.info("Backup process completed.");
            }
            BackupEvent::Progress { .. } => {}
        }

        self.progress.on_event(event);
    }
}
