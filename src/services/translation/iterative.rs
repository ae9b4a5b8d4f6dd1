//! Iterative Translation Engine
//!
//! Tool-calling session: the model explores the source tree and writes the
//! translation file by file until it calls `translation_complete` or the
//! iteration budget runs out.
//!
//! Every `tool_call` in a reply is answered by exactly one `tool_result`
//! with the same id before the history is sent again, including calls that
//! follow `translation_complete` in the same reply.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use project_translator_llm::{
    Conversation, ConversationMessage, LlmProvider, MessageBody, UsageStats,
};
use project_translator_tools::{translation_tools, FileAccess, ToolStats, TranslationToolset};
use serde::{Deserialize, Serialize};

use super::{ConversationLog, TranslationEngine, TranslationJob, TranslationStats};
use crate::models::config::TranslationMethod;
use crate::utils::error::{AppError, AppResult};

/// Sent when the model answers without calling any tool.
pub const CONTINUE_NUDGE: &str = "Please continue the translation using the available tools. Call translation_complete when every file has been written.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterativeSettings {
    pub max_iterations: u32,
    pub iteration_delay: Duration,
    /// Save the conversation log every N iterations
    pub auto_save_interval: u32,
}

impl Default for IterativeSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            iteration_delay: Duration::from_millis(500),
            auto_save_interval: 5,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The model called `translation_complete`
    Complete { summary: String },
    /// The iteration budget ran out
    Exhausted { iterations: u32 },
    /// The session could not start
    Failed { error: String },
}

impl SessionOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SessionOutcome::Complete { .. })
    }

    /// Failure text, `None` when complete.
    pub fn error_message(&self) -> Option<String> {
        match self {
            SessionOutcome::Complete { .. } => None,
            SessionOutcome::Exhausted { iterations } => Some(format!(
                "Translation did not complete within {} iterations",
                iterations
            )),
            SessionOutcome::Failed { error } => Some(error.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterativeStats {
    pub iterations: u32,
    pub tools: ToolStats,
    pub provider_errors: u32,
    pub usage: UsageStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Full result of one session.
#[derive(Debug, Clone)]
pub struct IterativeOutcome {
    pub outcome: SessionOutcome,
    pub stats: IterativeStats,
    pub conversation: Conversation,
}

pub struct IterativeTranslator {
    provider: Arc<dyn LlmProvider>,
    settings: IterativeSettings,
}

impl IterativeTranslator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: IterativeSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &IterativeSettings {
        &self.settings
    }

    /// Run one session to completion or exhaustion.
    pub async fn run(
        &self,
        job: &TranslationJob,
        mut log: Option<&mut ConversationLog>,
    ) -> IterativeOutcome {
        let mut conversation = Conversation::new();
        let mut stats = IterativeStats::default();

        let files = match FileAccess::new(&job.source_root, &job.output_root) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(error = %e, "cannot open translation sandbox");
                return IterativeOutcome {
                    outcome: SessionOutcome::Failed {
                        error: e.to_string(),
                    },
                    stats,
                    conversation,
                };
            }
        };
        let mut toolset = TranslationToolset::new(files);
        let tools = translation_tools();

        conversation.push(ConversationMessage::system(system_prompt(
            &job.source_language,
            &job.target_language,
        )));
        let mut opening = opening_message(job);
        if let Some(feedback) = &job.feedback {
            opening.push_str(feedback);
        }
        conversation.push(ConversationMessage::user(opening));

        let mut completed: Option<String> = None;
        for iteration in 1..=self.settings.max_iterations {
            stats.iterations = iteration;
            tracing::info!(iteration, max = self.settings.max_iterations, "translation iteration");

            match self.provider.send(conversation.messages(), &tools).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        stats.usage.accumulate(usage);
                    }
                    let has_calls = response.has_tool_calls();
                    conversation.extend(response.messages.iter().cloned());

                    for message in &response.messages {
                        let MessageBody::ToolCall { name, arguments, .. } = &message.body else {
                            continue;
                        };
                        tracing::debug!(tool = %name, id = %message.id, "dispatching tool call");
                        let outcome = toolset.dispatch(name, arguments);
                        conversation.push(ConversationMessage::tool_result(
                            message.id.clone(),
                            outcome.result.to_content(),
                            !outcome.result.success,
                        ));
                        if let Some(summary) = outcome.completion {
                            completed = Some(summary);
                        }
                    }

                    if !has_calls {
                        conversation.push(ConversationMessage::user(CONTINUE_NUDGE));
                    }
                }
                Err(e) => {
                    stats.provider_errors += 1;
                    tracing::warn!(iteration, error = %e, "provider call failed");
                    conversation.push(ConversationMessage::user(format!(
                        "Error occurred: {}. Please continue with the translation.",
                        e
                    )));
                }
            }
            debug_assert!(conversation.is_balanced());

            if let Some(log) = log.as_deref_mut() {
                if iteration % self.settings.auto_save_interval.max(1) == 0 {
                    log.record_messages(conversation.messages());
                    if let Err(e) = log.save() {
                        tracing::warn!(error = %e, "failed to auto-save conversation");
                    }
                }
            }

            if completed.is_some() {
                break;
            }
            if !self.settings.iteration_delay.is_zero() {
                tokio::time::sleep(self.settings.iteration_delay).await;
            }
        }

        stats.tools = toolset.stats();
        let outcome = match completed {
            Some(summary) => {
                tracing::info!(iterations = stats.iterations, summary = %summary, "translation complete");
                stats.summary = Some(summary.clone());
                SessionOutcome::Complete { summary }
            }
            None => {
                tracing::warn!(iterations = stats.iterations, "translation budget exhausted");
                SessionOutcome::Exhausted {
                    iterations: stats.iterations,
                }
            }
        };

        if let Some(log) = log {
            log.record_messages(conversation.messages());
            log.set_summary(serde_json::json!({ "outcome": &outcome, "stats": &stats }));
            if let Err(e) = log.save() {
                tracing::warn!(error = %e, "failed to save conversation");
            }
        }

        IterativeOutcome {
            outcome,
            stats,
            conversation,
        }
    }
}

#[async_trait]
impl TranslationEngine for IterativeTranslator {
    fn method(&self) -> TranslationMethod {
        TranslationMethod::Iterative
    }

    async fn translate(
        &self,
        job: &TranslationJob,
        log: Option<&mut ConversationLog>,
    ) -> AppResult<TranslationStats> {
        let result = self.run(job, log).await;
        match result.outcome.error_message() {
            None => Ok(TranslationStats::Iterative(result.stats)),
            Some(error) => Err(AppError::translation(error)),
        }
    }
}

/// System prompt describing the target contract and the tools.
pub fn system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are an expert project translator. Your task is to translate a Docker containerized REST API project from {src} to {dst} while maintaining exact functionality.

IMPORTANT REQUIREMENTS:
1. The translated project must be a Docker containerized REST API
2. The API behavior must be EXACTLY the same as the original
3. The Dockerfile must use port 8000
4. All functionalities must be preserved
5. The project structure should be adapted to {dst} conventions

COMMUNICATION PROTOCOL:
You can use the following tools to interact with the project:
- list_directory(directory_path): List contents of a source directory
- get_file(file_path): Get the content of a source file
- write_file(file_path, content): Write a file into the output directory
- analyze_project(): Summarize project type, dependencies and Docker setup
- ask_question(question): Ask clarifying questions
- translation_complete(translation_summary): Call once every file has been written

TRANSLATION PROCESS:
1. First, request the directory structure with list_directory("/")
2. Analyze the project architecture and plan your translation strategy
3. Request source files as needed with get_file()
4. Translate files and write them with write_file()
5. Ensure all dependencies and configurations are properly translated
6. Verify the translation maintains the same API behavior
7. Call translation_complete with a short summary

Start by requesting the directory structure of the source project."#,
        src = source_language,
        dst = target_language
    )
}

fn opening_message(job: &TranslationJob) -> String {
    format!(
        "Please translate the project from {} to {}. Start by exploring the source project structure.",
        job.source_language, job.target_language
    )
}
