//! Project Translator CLI entry point

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use project_translator::commands::Cli;
use project_translator::storage::ConfigService;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, &cli.config);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("interrupt received, stopping after the current attempt");
                signal_token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to install Ctrl+C handler"),
        }
    });

    match cli.execute(cancel).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins, then `--verbose`, then `logging.level` from the config file.
fn init_tracing(verbose: bool, config_path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug".to_string()
        } else {
            configured_level(config_path)
        };
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn configured_level(config_path: &Path) -> String {
    if !config_path.exists() {
        return "info".to_string();
    }
    ConfigService::load_from_file(config_path)
        .map(|config| config.logging.level.to_lowercase())
        .unwrap_or_else(|_| "info".to_string())
}
