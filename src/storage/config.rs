//! JSON Configuration Management
//!
//! Reads and writes the translator's configuration file.

use std::path::{Path, PathBuf};

use project_translator_core::{read_json, write_json_atomic};

use crate::models::config::TranslatorConfig;
use crate::utils::error::{AppError, AppResult};

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Owns the configuration and the file it came from.
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: TranslatorConfig,
}

impl ConfigService {
    /// Load `path`, writing defaults there first if it does not exist.
    pub fn load_or_init(path: &Path) -> AppResult<Self> {
        let config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            let default_config = TranslatorConfig::default();
            Self::save_to_file(path, &default_config)?;
            tracing::info!(path = %path.display(), "created default configuration");
            default_config
        };

        Ok(Self {
            config_path: path.to_path_buf(),
            config,
        })
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> AppResult<TranslatorConfig> {
        let config: TranslatorConfig = read_json(path)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    pub fn save_to_file(path: &Path, config: &TranslatorConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        write_json_atomic(path, config)?;
        Ok(())
    }

    /// Write defaults to `path`. Refuses to overwrite unless `force`.
    pub fn init(path: &Path, force: bool) -> AppResult<TranslatorConfig> {
        if path.exists() && !force {
            return Err(AppError::config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        let config = TranslatorConfig::default();
        Self::save_to_file(path, &config)?;
        Ok(config)
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn into_config(self) -> TranslatorConfig {
        self.config
    }
}
