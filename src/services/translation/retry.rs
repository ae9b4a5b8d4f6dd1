//! Retry Orchestrator
//!
//! Translate, verify, analyze and repeat, up to `max_retries + 1` attempts.
//! The loop is driven by [`RetryState`]; [`RetryState::next`] is the whole
//! transition table.

use std::sync::Arc;

use project_translator_verify::{ProjectVerifier, TestExecutionResult};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error_analyzer::{generate_feedback, ErrorAnalyzer, ErrorInfo, ErrorKind};
use super::{ConversationLog, TranslationEngine, TranslationJob, TranslationStats};

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetryState {
    Translating { attempt: u32 },
    Verifying { attempt: u32 },
    Deciding { attempt: u32, success: bool },
    Succeeded { attempt: u32 },
    Exhausted,
    Cancelled,
}

/// Inputs that move the loop forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    Translated,
    TranslationFailed,
    Verified { success: bool },
    Decide,
    Cancel,
}

impl RetryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. } | RetryState::Exhausted | RetryState::Cancelled
        )
    }

    /// Transition for `event`. Terminal states absorb every event, and an
    /// event that does not apply leaves the state unchanged.
    pub fn next(self, event: RetryEvent, max_attempts: u32) -> RetryState {
        if self.is_terminal() {
            return self;
        }
        match (self, event) {
            (_, RetryEvent::Cancel) => RetryState::Cancelled,
            (RetryState::Translating { attempt }, RetryEvent::Translated) => {
                RetryState::Verifying { attempt }
            }
            (RetryState::Translating { attempt }, RetryEvent::TranslationFailed) => {
                RetryState::Deciding {
                    attempt,
                    success: false,
                }
            }
            (RetryState::Verifying { attempt }, RetryEvent::Verified { success }) => {
                RetryState::Deciding { attempt, success }
            }
            (RetryState::Deciding { attempt, success: true }, RetryEvent::Decide) => {
                RetryState::Succeeded { attempt }
            }
            (RetryState::Deciding { attempt, success: false }, RetryEvent::Decide) => {
                if attempt >= max_attempts {
                    RetryState::Exhausted
                } else {
                    RetryState::Translating {
                        attempt: attempt + 1,
                    }
                }
            }
            (state, _) => state,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// One finished attempt. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    pub attempt: u32,
    pub success: bool,
    pub error_count: usize,
    pub errors: Vec<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_stats: Option<TranslationStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result: Option<TestExecutionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub success: bool,
    pub message: String,
    pub attempts: u32,
    pub retry_attempts: Vec<RetryAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_stats: Option<TranslationStats>,
    pub final_state: RetryState,
}

/// Feedback block appended to the instructions of attempt `attempt`.
pub fn retry_instructions(attempt: u32, feedback: &str) -> String {
    format!(
        "\n\nIMPORTANT: This is retry attempt {}. The previous translation had issues:\n\n{}\n\n\
Please address these specific issues in your translation:\n\
- Fix any build errors\n\
- Ensure the service starts correctly\n\
- Make sure all API endpoints work as expected\n\
- Verify the Docker configuration is correct\n",
        attempt, feedback
    )
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct RetryOrchestrator {
    engine: Arc<dyn TranslationEngine>,
    verifier: Option<Arc<dyn ProjectVerifier>>,
    analyzer: ErrorAnalyzer,
    max_retries: u32,
    cancel: Option<CancellationToken>,
    log: Option<ConversationLog>,
}

impl RetryOrchestrator {
    /// Without a verifier every structurally successful translation passes.
    pub fn new(
        engine: Arc<dyn TranslationEngine>,
        verifier: Option<Arc<dyn ProjectVerifier>>,
        max_retries: u32,
    ) -> Self {
        Self {
            engine,
            verifier,
            analyzer: ErrorAnalyzer::new(),
            max_retries,
            cancel: None,
            log: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_log(mut self, log: ConversationLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn log(&self) -> Option<&ConversationLog> {
        self.log.as_ref()
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    pub async fn run(&mut self, job: &TranslationJob) -> RetryOutcome {
        let max_attempts = self.max_attempts();
        let mut history: Vec<RetryAttempt> = Vec::new();
        let mut all_errors: Vec<ErrorInfo> = Vec::new();
        let mut last_stats: Option<TranslationStats> = None;

        let mut state = RetryState::Translating { attempt: 1 };
        if self.cancelled() {
            state = state.next(RetryEvent::Cancel, max_attempts);
        }

        while !state.is_terminal() {
            let RetryState::Translating { attempt } = state else {
                break;
            };
            tracing::info!(attempt, max_attempts, method = %self.engine.method(), "starting translation attempt");

            let mut attempt_job = job.clone();
            if attempt > 1 && !all_errors.is_empty() {
                let feedback = retry_instructions(attempt, &generate_feedback(&all_errors));
                attempt_job.feedback = Some(match &job.feedback {
                    Some(base) => format!("{}{}", base, feedback),
                    None => feedback,
                });
            }

            let translated = self.engine.translate(&attempt_job, self.log.as_mut()).await;

            let mut record = RetryAttempt {
                attempt,
                success: false,
                error_count: 0,
                errors: Vec::new(),
                translation_stats: None,
                test_result: None,
            };

            match translated {
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "translation failed");
                    record.errors.push(
                        ErrorInfo::new(ErrorKind::UnknownError, "Translation failed", e.to_string())
                            .with_suggestion("Check the model response and provider configuration"),
                    );
                    state = state.next(RetryEvent::TranslationFailed, max_attempts);
                }
                Ok(stats) => {
                    state = state.next(RetryEvent::Translated, max_attempts);
                    record.translation_stats = Some(stats.clone());
                    last_stats = Some(stats);

                    let success = match &self.verifier {
                        Some(verifier) => {
                            let result = verifier.verify(&job.output_root).await;
                            record.errors = self.analyzer.analyze_execution(&result);
                            let success = result.success;
                            record.test_result = Some(result);
                            success
                        }
                        None => {
                            tracing::info!(attempt, "no test cases configured, skipping verification");
                            true
                        }
                    };
                    state = state.next(RetryEvent::Verified { success }, max_attempts);
                }
            }

            if let RetryState::Deciding { success, .. } = state {
                record.success = success;
            }
            record.error_count = record.errors.len();
            all_errors.extend(record.errors.iter().cloned());
            tracing::info!(attempt, success = record.success, errors = record.error_count, "attempt finished");
            history.push(record);

            state = state.next(RetryEvent::Decide, max_attempts);
            if !state.is_terminal() && self.cancelled() {
                tracing::warn!(attempt, "retry loop cancelled");
                state = state.next(RetryEvent::Cancel, max_attempts);
            }
        }

        let attempts = history.len() as u32;
        let (success, message) = match state {
            RetryState::Succeeded { attempt } => {
                (true, format!("Translation successful after {} attempt(s)", attempt))
            }
            RetryState::Cancelled => (
                false,
                format!("Translation cancelled after {} attempt(s)", attempts),
            ),
            _ => (false, format!("Translation failed after {} attempts", attempts)),
        };

        let translation_stats = if success {
            last_stats
        } else {
            None
        };
        let outcome = RetryOutcome {
            success,
            message,
            attempts,
            retry_attempts: history,
            translation_stats,
            final_state: state,
        };

        if let Some(log) = self.log.as_mut() {
            match serde_json::to_value(&outcome) {
                Ok(summary) => log.set_summary(summary),
                Err(e) => tracing::warn!(error = %e, "could not serialize retry outcome"),
            }
            if let Err(e) = log.finish() {
                tracing::warn!(error = %e, "failed to save conversation log");
            }
        }

        if outcome.success {
            tracing::info!(attempts, "{}", outcome.message);
        } else {
            tracing::warn!(attempts, "{}", outcome.message);
        }
        outcome
    }
}
