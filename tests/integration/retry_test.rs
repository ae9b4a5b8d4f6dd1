//! Retry Orchestrator Integration Tests
//!
//! Batch engine + scripted provider + queued verifier results.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use project_translator::services::translation::{
    BatchTranslator, ConversationLog, ErrorKind, RetryOrchestrator, RetryState, SessionMetadata,
    TranslationJob,
};
use project_translator_verify::{ProjectVerifier, TestExecutionResult};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::support::{
    failed_build, passed, sample_project, text_reply, QueuedVerifier, ScriptedProvider,
    BATCH_ANSWER,
};

fn job(temp: &TempDir) -> TranslationJob {
    let source = sample_project(temp.path());
    TranslationJob::new(source, temp.path().join("output"), "python", "go")
}

/// System instructions of the n-th request.
fn instructions(provider: &ScriptedProvider, n: usize) -> String {
    provider.requests()[n][0].text().unwrap().to_string()
}

// ============================================================================
// Attempts and feedback
// ============================================================================

#[tokio::test]
async fn test_succeeds_on_second_attempt_with_feedback() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER), text_reply(BATCH_ANSWER)]);
    let verifier = QueuedVerifier::new(vec![
        failed_build("Build failed with return code 1: Dockerfile error: no such file go.sum"),
        passed(),
    ]);
    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider.clone())),
        Some(verifier.clone()),
        3,
    );

    let outcome = orchestrator.run(&job).await;
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.message, "Translation successful after 2 attempt(s)");
    assert_eq!(outcome.final_state, RetryState::Succeeded { attempt: 2 });
    assert_eq!(verifier.calls(), 2);
    assert_eq!(outcome.translation_stats.as_ref().unwrap().files_written(), 2);

    let first = &outcome.retry_attempts[0];
    assert!(!first.success);
    assert_eq!(first.error_count, first.errors.len());
    assert_eq!(first.errors[0].kind, ErrorKind::BuildError);
    assert!(first.test_result.is_some());
    assert!(outcome.retry_attempts[1].success);
    assert_eq!(outcome.retry_attempts[1].error_count, 0);

    let first_instructions = instructions(&provider, 0);
    assert!(!first_instructions.contains("IMPORTANT: This is retry attempt"));
    let retry = instructions(&provider, 1);
    assert!(retry.contains("IMPORTANT: This is retry attempt 2."));
    assert!(retry.contains("TRANSLATION ERRORS DETECTED:"));
    assert!(retry.contains("ERROR 1: BUILD_ERROR"));
    assert!(retry.contains("Check Dockerfile syntax and base image"));
}

#[tokio::test]
async fn test_exhausts_after_max_retries() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER), text_reply(BATCH_ANSWER)]);
    let verifier = QueuedVerifier::new(vec![
        failed_build("Build failed with return code 2: alpha"),
        failed_build("Build failed with return code 2: beta"),
    ]);
    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider.clone())),
        Some(verifier.clone()),
        1,
    );

    let outcome = orchestrator.run(&job).await;
    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.message, "Translation failed after 2 attempts");
    assert_eq!(outcome.final_state, RetryState::Exhausted);
    assert!(outcome.translation_stats.is_none());
    assert_eq!(provider.requests().len(), 2);
    assert_eq!(verifier.calls(), 2);
}

#[tokio::test]
async fn test_feedback_covers_every_prior_attempt() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![
        text_reply(BATCH_ANSWER),
        text_reply(BATCH_ANSWER),
        text_reply(BATCH_ANSWER),
    ]);
    let verifier = QueuedVerifier::new(vec![
        failed_build("Build failed with return code 2: alpha"),
        failed_build("Build failed with return code 2: beta"),
        passed(),
    ]);
    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider.clone())),
        Some(verifier),
        2,
    );

    let outcome = orchestrator.run(&job).await;
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 3);

    let third = instructions(&provider, 2);
    assert!(third.contains("IMPORTANT: This is retry attempt 3."));
    assert!(third.contains("alpha"));
    assert!(third.contains("beta"));
}

#[tokio::test]
async fn test_translation_failure_skips_verification() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![
        text_reply("I refuse to answer in JSON."),
        text_reply(BATCH_ANSWER),
    ]);
    let verifier = QueuedVerifier::new(vec![passed()]);
    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider.clone())),
        Some(verifier.clone()),
        3,
    );

    let outcome = orchestrator.run(&job).await;
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(verifier.calls(), 1);

    let failed = &outcome.retry_attempts[0];
    assert!(!failed.success);
    assert!(failed.translation_stats.is_none());
    assert!(failed.test_result.is_none());
    assert_eq!(failed.errors.len(), 1);
    assert_eq!(failed.errors[0].kind, ErrorKind::UnknownError);
    assert_eq!(failed.errors[0].message, "Translation failed");
    assert!(failed.errors[0].context.contains("No JSON object found in response"));

    assert!(instructions(&provider, 1).contains("UNKNOWN_ERROR"));
}

#[tokio::test]
async fn test_without_verifier_first_translation_wins() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER)]);
    let mut orchestrator =
        RetryOrchestrator::new(Arc::new(BatchTranslator::new(provider.clone())), None, 3);

    let outcome = orchestrator.run(&job).await;
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(provider.requests().len(), 1);
    assert!(job.output_root.join("main.go").is_file());
}

// ============================================================================
// Cancellation
// ============================================================================

/// Fails verification and cancels the run while doing so.
struct CancellingVerifier {
    token: CancellationToken,
}

#[async_trait]
impl ProjectVerifier for CancellingVerifier {
    async fn verify(&self, _project_dir: &Path) -> TestExecutionResult {
        self.token.cancel();
        failed_build("Build failed with return code 1: interrupted")
    }
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER)]);
    let token = CancellationToken::new();
    token.cancel();

    let mut orchestrator =
        RetryOrchestrator::new(Arc::new(BatchTranslator::new(provider.clone())), None, 3)
            .with_cancellation(token);
    let outcome = orchestrator.run(&job).await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(outcome.final_state, RetryState::Cancelled);
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_cancel_between_attempts_keeps_history() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER), text_reply(BATCH_ANSWER)]);
    let token = CancellationToken::new();
    let verifier = Arc::new(CancellingVerifier {
        token: token.clone(),
    });

    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider.clone())),
        Some(verifier),
        3,
    )
    .with_cancellation(token);
    let outcome = orchestrator.run(&job).await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.final_state, RetryState::Cancelled);
    assert_eq!(outcome.retry_attempts[0].errors[0].kind, ErrorKind::BuildError);
    assert_eq!(provider.requests().len(), 1);
}

// ============================================================================
// Session log
// ============================================================================

#[tokio::test]
async fn test_run_summary_is_written_to_log() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER)]);
    let metadata = SessionMetadata::new(
        "batch",
        "python",
        "go",
        &job.source_root,
        &job.output_root,
        "scripted",
        "scripted-model",
    );
    let log = ConversationLog::create(&temp.path().join("logs"), Some("run.json"), metadata).unwrap();

    let mut orchestrator =
        RetryOrchestrator::new(Arc::new(BatchTranslator::new(provider)), None, 0).with_log(log);
    let outcome = orchestrator.run(&job).await;
    assert!(outcome.success);

    let saved: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join("logs/run.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["summary"]["success"], true);
    assert_eq!(saved["summary"]["attempts"], 1);
    assert!(saved["metadata"]["end_time"].is_string());
}
