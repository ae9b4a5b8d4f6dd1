//! Translation Services
//!
//! Engines that turn a source project into a translated one, plus the error
//! analysis and retry loop that verify and re-drive them.
//!
//! ## Module Organization
//!
//! - `batch` - Batch request/response protocol and the positional parser
//! - `batch_translator` - One-shot engine over `batch`
//! - `iterative` - Tool-calling engine over the conversation protocol
//! - `error_analyzer` - Failure classification and feedback text
//! - `retry` - Translate, verify, analyze, repeat
//! - `conversation_log` - Session persistence

pub mod batch;
pub mod batch_translator;
pub mod conversation_log;
pub mod error_analyzer;
pub mod iterative;
pub mod retry;

use std::path::PathBuf;

use async_trait::async_trait;
use project_translator_llm::UsageStats;
use serde::{Deserialize, Serialize};

use crate::models::config::TranslationMethod;
use crate::utils::error::AppResult;

pub use batch_translator::{BatchStats, BatchTranslator};
pub use conversation_log::{ConversationLog, SessionMetadata};
pub use error_analyzer::{ErrorAnalyzer, ErrorInfo, ErrorKind};
pub use iterative::{IterativeOutcome, IterativeSettings, IterativeStats, IterativeTranslator, SessionOutcome};
pub use retry::{RetryAttempt, RetryEvent, RetryOrchestrator, RetryOutcome, RetryState};

/// One translation to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub source_language: String,
    pub target_language: String,
    /// Extra instruction text, appended by the engine to its prompt
    pub feedback: Option<String>,
}

impl TranslationJob {
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        source_language: &str,
        target_language: &str,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// Per-engine statistics of a finished translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TranslationStats {
    Batch(BatchStats),
    Iterative(IterativeStats),
}

impl TranslationStats {
    pub fn files_written(&self) -> u32 {
        match self {
            TranslationStats::Batch(s) => s.files_written,
            TranslationStats::Iterative(s) => s.tools.files_written,
        }
    }

    pub fn usage(&self) -> UsageStats {
        match self {
            TranslationStats::Batch(s) => s.usage,
            TranslationStats::Iterative(s) => s.usage,
        }
    }
}

/// Something that can translate a project into an output directory.
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    fn method(&self) -> TranslationMethod;

    /// Translate `job`, recording the exchange in `log` when given.
    ///
    /// An `Err` means no usable translation was produced.
    async fn translate(
        &self,
        job: &TranslationJob,
        log: Option<&mut ConversationLog>,
    ) -> AppResult<TranslationStats>;
}
