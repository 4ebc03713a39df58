//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

// Re-export command types for convenience
pub use crate::commands::backup::BackupArgs;
pub use crate::commands::upload::UploadArgs;

/// devftp - project backups shipped over FTP
#[derive(Parser, Debug)]
#[command(name = "devftp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project root to back up (defaults to the current directory)
    #[arg(long, global = true, env = "DEVFTP_ROOT")]
    pub root: Option<Utf8PathBuf>,

    /// Path to devftp.yaml upload config (defaults to <root>/devftp.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive the project into storage/app/devftp/backup
    Backup(BackupArgs),

    /// Upload a file to the configured FTP directory
    Upload(UploadArgs),
}
