//! Conversation Log
//!
//! Persists one translation session (metadata, message history, raw model
//! answers and a summary) as a JSON file. Every save rewrites the whole file
//! atomically.

use std::path::{Path, PathBuf};

use project_translator_core::write_json_atomic;
use project_translator_llm::ConversationMessage;
use serde::{Deserialize, Serialize};

use crate::utils::error::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    /// `batch`, `iterative` or `retry`
    pub translation_type: String,
    pub source_language: String,
    pub target_language: String,
    pub source_path: String,
    pub output_path: String,
    pub provider: String,
    pub model: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl SessionMetadata {
    pub fn new(
        translation_type: &str,
        source_language: &str,
        target_language: &str,
        source_path: &Path,
        output_path: &Path,
        provider: &str,
        model: &str,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            translation_type: translation_type.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            source_path: source_path.display().to_string(),
            output_path: output_path.display().to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            start_time: chrono::Utc::now().to_rfc3339(),
            end_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    #[serde(skip)]
    path: PathBuf,
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub conversation: Vec<ConversationMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_responses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}

/// `translation_{YYYYmmdd_HHMMSS}.json` for the current local time.
pub fn default_log_file_name() -> String {
    format!(
        "translation_{}.json",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

impl ConversationLog {
    /// Create the log file under `dir` and write the initial metadata.
    pub fn create(dir: &Path, file_name: Option<&str>, metadata: SessionMetadata) -> AppResult<Self> {
        let file_name = file_name
            .map(str::to_string)
            .unwrap_or_else(default_log_file_name);
        let log = Self {
            path: dir.join(file_name),
            metadata,
            conversation: Vec::new(),
            raw_responses: Vec::new(),
            summary: None,
        };
        log.save()?;
        tracing::info!(path = %log.path.display(), "conversation log created");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the recorded history with `messages`.
    pub fn record_messages(&mut self, messages: &[ConversationMessage]) {
        self.conversation = messages.to_vec();
    }

    pub fn push_raw_response(&mut self, text: impl Into<String>) {
        self.raw_responses.push(text.into());
    }

    pub fn set_summary(&mut self, summary: serde_json::Value) {
        self.summary = Some(summary);
    }

    /// Stamp the end time and save.
    pub fn finish(&mut self) -> AppResult<()> {
        self.metadata.end_time = Some(chrono::Utc::now().to_rfc3339());
        self.save()
    }

    pub fn save(&self) -> AppResult<()> {
        write_json_atomic(&self.path, self)?;
        tracing::debug!(path = %self.path.display(), messages = self.conversation.len(), "conversation log saved");
        Ok(())
    }
}
