//! CLI Commands
//!
//! Argument definitions and one handler module per command group. Handlers
//! return `Ok(true)` when the operation succeeded, `Ok(false)` when it ran but
//! its result is a failure (the binary exits non-zero), and `Err` when it
//! could not run at all.

pub mod config;
pub mod translate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::storage::DEFAULT_CONFIG_FILE;

/// Translate containerized REST services between languages and verify them.
#[derive(Parser, Debug)]
#[command(name = "project-translator", version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate a project.
    #[command(subcommand)]
    Translate(translate::TranslateCommand),

    /// Verify a project against HTTP test scenarios.
    #[command(subcommand)]
    Test(test::TestCommand),

    /// Manage the configuration file.
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

impl Cli {
    pub async fn execute(self, cancel: CancellationToken) -> anyhow::Result<bool> {
        match self.command {
            Command::Translate(cmd) => translate::run(cmd, &self.config, cancel).await,
            Command::Test(cmd) => test::run(cmd, &self.config).await,
            Command::Config(cmd) => config::run(cmd, &self.config),
        }
    }
}
