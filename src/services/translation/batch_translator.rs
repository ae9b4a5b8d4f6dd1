//! Batch Translation Engine
//!
//! Sends the whole project in one round-trip, parses the answer with the
//! batch protocol and writes every returned file into the output sandbox.

use std::sync::Arc;

use async_trait::async_trait;
use project_translator_llm::{ConversationMessage, LlmProvider, UsageStats};
use project_translator_tools::FileAccess;
use serde::{Deserialize, Serialize};

use super::batch;
use super::{ConversationLog, TranslationEngine, TranslationJob, TranslationStats};
use crate::models::config::TranslationMethod;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub files_translated: u32,
    pub files_written: u32,
    pub write_errors: u32,
    pub warnings: Vec<String>,
    pub summary: String,
    pub usage: UsageStats,
}

pub struct BatchTranslator {
    provider: Arc<dyn LlmProvider>,
}

impl BatchTranslator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TranslationEngine for BatchTranslator {
    fn method(&self) -> TranslationMethod {
        TranslationMethod::Batch
    }

    async fn translate(
        &self,
        job: &TranslationJob,
        mut log: Option<&mut ConversationLog>,
    ) -> AppResult<TranslationStats> {
        let mut request =
            batch::create_request(&job.source_root, &job.source_language, &job.target_language)?;
        if let Some(feedback) = &job.feedback {
            request.instructions.push_str(feedback);
        }

        let mut messages = vec![
            ConversationMessage::system(request.instructions.clone()),
            ConversationMessage::user(request.request_text()),
        ];

        tracing::info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            files = request.project_files.len(),
            "sending batch translation request"
        );
        let response = self.provider.send(&messages, &[]).await?;
        let text = response.text();
        messages.extend(response.messages.iter().cloned());

        if let Some(log) = log.as_deref_mut() {
            log.record_messages(&messages);
            log.push_raw_response(text.clone());
            if let Err(e) = log.save() {
                tracing::warn!(error = %e, "failed to save conversation");
            }
        }

        let parsed = batch::parse_response(&text)?;
        let errors = batch::validate(&parsed);
        if !errors.is_empty() {
            return Err(AppError::translation(format!(
                "Invalid translation response: {}",
                errors.join("; ")
            )));
        }

        let files = FileAccess::new(&job.source_root, &job.output_root)?;
        let mut stats = BatchStats {
            files_translated: parsed.translated_files.len() as u32,
            warnings: parsed.warnings,
            summary: parsed.translation_summary,
            usage: response.usage.unwrap_or_default(),
            ..Default::default()
        };
        for file in &parsed.translated_files {
            match files.write(&file.path, &file.content) {
                Ok(written) => {
                    stats.files_written += 1;
                    tracing::debug!(path = %written.path, bytes = written.bytes, "wrote translated file");
                }
                Err(e) => {
                    stats.write_errors += 1;
                    tracing::warn!(path = %file.path, error = %e, "failed to write translated file");
                }
            }
        }

        tracing::info!(
            written = stats.files_written,
            write_errors = stats.write_errors,
            "batch translation finished"
        );
        Ok(TranslationStats::Batch(stats))
    }
}
