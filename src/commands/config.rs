//! Config Commands

use std::path::Path;

use clap::Subcommand;

use crate::storage::ConfigService;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,

    /// Write the default configuration.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Check the configuration file.
    Validate,
}

pub fn run(cmd: ConfigCommand, config_path: &Path) -> anyhow::Result<bool> {
    match cmd {
        ConfigCommand::Show => {
            let service = ConfigService::load_or_init(config_path)?;
            println!("{}", serde_json::to_string_pretty(service.config())?);
            Ok(true)
        }
        ConfigCommand::Init { force } => {
            ConfigService::init(config_path, force)?;
            println!("Configuration written to {}", config_path.display());
            Ok(true)
        }
        ConfigCommand::Validate => match ConfigService::load_from_file(config_path) {
            Ok(_) => {
                println!("Configuration {} is valid", config_path.display());
                Ok(true)
            }
            Err(e) => {
                println!("Configuration {} is invalid: {}", config_path.display(), e);
                Ok(false)
            }
        },
    }
}
