//! Project Translator
//!
//! Translates a containerized REST service from one language to another with
//! an LLM, then verifies the result by building it, starting it and replaying
//! HTTP scenarios against it. Failures are classified and fed back into the
//! next attempt.
//!
//! - `commands` - CLI command handlers
//! - `services` - Translation engines, error analysis and the retry loop
//! - `storage` - Configuration file handling
//! - `models` - Configuration model
//! - `utils` - Error type

pub mod commands;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::config::{TranslationMethod, TranslatorConfig};
pub use services::translation::{
    BatchTranslator, ErrorAnalyzer, IterativeTranslator, RetryOrchestrator, RetryOutcome,
    TranslationEngine, TranslationJob, TranslationStats,
};
pub use storage::config::ConfigService;
pub use utils::error::{AppError, AppResult};
