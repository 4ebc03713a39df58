//! CLI command implementations

pub mod backup;
pub mod upload;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use devftp_core::ProjectPaths;
use tracing::debug;

use crate::cli::Cli;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: ProjectPaths,
    pub config_file: PathBuf,
    pub quiet: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone().into_std_path_buf(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let paths = ProjectPaths::new(root);
        let config_file = match &cli.config {
            Some(path) => path.clone().into_std_path_buf(),
            None => paths.config_file(),
        };

        debug!(
            "Project root: {}, config file: {}",
            paths.root().display(),
            config_file.display()
        );

        Ok(Self {
            paths,
            config_file,
            quiet: cli.quiet,
        })
    }
}
