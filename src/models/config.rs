//! Configuration Models
//!
//! The translator's `config.json`. Every field has a serde default so a
//! partial file is always loadable.

use std::time::Duration;

use project_translator_llm::{ProviderConfig, ProviderType};
use project_translator_verify::ServiceTimeouts;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// LLM provider section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    /// Empty means "read OPENAI_API_KEY"
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout: u64,
}

fn default_provider() -> ProviderType {
    ProviderType::OpenAI
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout: default_llm_timeout(),
        }
    }
}

impl LlmProviderConfig {
    /// Provider settings, falling back to `OPENAI_API_KEY` for the key.
    pub fn provider_config(&self) -> ProviderConfig {
        self.provider_config_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn provider_config_with_env(&self, env_key: Option<String>) -> ProviderConfig {
        let api_key = Some(self.api_key.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| env_key.filter(|k| !k.trim().is_empty()));
        ProviderConfig {
            provider: self.provider,
            api_key,
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout_secs: self.timeout,
        }
    }
}

/// Which engine produces the translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMethod {
    /// One request, whole project in, whole project out
    #[default]
    Batch,
    /// Tool-calling session
    Iterative,
}

impl std::fmt::Display for TranslationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationMethod::Batch => write!(f, "batch"),
            TranslationMethod::Iterative => write!(f, "iterative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSettings {
    #[serde(default)]
    pub method: TranslationMethod,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_iteration_delay_ms")]
    pub iteration_delay_ms: u64,
    #[serde(default = "default_true")]
    pub save_conversation: bool,
    #[serde(default = "default_conversation_dir")]
    pub conversation_dir: String,
    /// Fixed log file name; a timestamped name is used when unset
    #[serde(default)]
    pub conversation_file: Option<String>,
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval: u32,
    #[serde(default = "default_true")]
    pub retry_on_error: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_iterations() -> u32 {
    50
}

fn default_iteration_delay_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_conversation_dir() -> String {
    "conversations".to_string()
}

fn default_auto_save_interval() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            method: TranslationMethod::default(),
            max_iterations: default_max_iterations(),
            iteration_delay_ms: default_iteration_delay_ms(),
            save_conversation: true,
            conversation_dir: default_conversation_dir(),
            conversation_file: None,
            auto_save_interval: default_auto_save_interval(),
            retry_on_error: true,
            max_retries: default_max_retries(),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// General operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
    #[serde(default = "default_build_timeout")]
    pub build_timeout: u64,
    #[serde(default = "default_health_timeout")]
    pub health_timeout: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm_provider: LlmProviderConfig,
    #[serde(default)]
    pub translation: TranslationSettings,
}

fn default_base_url() -> String {
    project_translator_verify::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_startup_timeout() -> u64 {
    120
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_build_timeout() -> u64 {
    300
}

fn default_health_timeout() -> u64 {
    60
}

fn default_check_interval() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    10
}

fn default_output_file() -> String {
    "test_results.json".to_string()
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            startup_timeout: default_startup_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            build_timeout: default_build_timeout(),
            health_timeout: default_health_timeout(),
            check_interval: default_check_interval(),
            request_timeout: default_request_timeout(),
            output_file: default_output_file(),
            logging: LoggingConfig::default(),
            llm_provider: LlmProviderConfig::default(),
            translation: TranslationSettings::default(),
        }
    }
}

impl TranslatorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "Invalid base_url: {}. Must start with http:// or https://",
                self.base_url
            ));
        }

        let timeouts = [
            ("timeout", self.timeout),
            ("startup_timeout", self.startup_timeout),
            ("shutdown_timeout", self.shutdown_timeout),
            ("build_timeout", self.build_timeout),
            ("health_timeout", self.health_timeout),
            ("check_interval", self.check_interval),
            ("request_timeout", self.request_timeout),
            ("llm_provider.timeout", self.llm_provider.timeout),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(format!("{} must be greater than 0", name));
        }

        let llm = &self.llm_provider;
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                llm.temperature
            ));
        }
        if llm.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if llm.model.trim().is_empty() {
            return Err("model cannot be empty".to_string());
        }

        if self.translation.max_iterations == 0 {
            return Err("max_iterations must be greater than 0".to_string());
        }
        if self.translation.auto_save_interval == 0 {
            return Err("auto_save_interval must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Service lifecycle budgets for the Test Executor.
    pub fn service_timeouts(&self) -> ServiceTimeouts {
        ServiceTimeouts {
            build: Duration::from_secs(self.build_timeout),
            startup: Duration::from_secs(self.startup_timeout),
            shutdown: Duration::from_secs(self.shutdown_timeout),
            health: Duration::from_secs(self.health_timeout),
            check_interval: Duration::from_secs(self.check_interval),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
