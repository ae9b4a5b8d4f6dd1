//! Verification Integration Tests
//!
//! The real Test Executor verifying translated output through the retry
//! loop. The "service" is an in-process axum server; start.sh and
//! shutdown.sh only leave traces on disk.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use project_translator::services::translation::{
    BatchTranslator, ErrorKind, RetryOrchestrator, RetryState, TranslationJob,
};
use project_translator_verify::{ExecutorConfig, ExecutorPhase, ServiceTimeouts, TestExecutor};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::support::{sample_project, text_reply, ScriptedProvider, BATCH_ANSWER};

async fn spawn_service() -> String {
    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route(
            "/items",
            get(|| async { Json(json!([{"id": 1, "name": "first"}])) }).post(
                |Json(body): Json<Value>| async move {
                    (
                        StatusCode::CREATED,
                        Json(json!({"id": 2, "name": body["name"]})),
                    )
                },
            ),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn write_suite(dir: &Path, base_url: &str, expected_items: u64) -> std::path::PathBuf {
    let suite = json!({
        "test_suite": "Items API",
        "base_url": base_url,
        "scenarios": [{
            "name": "crud",
            "description": "create then list",
            "steps": [
                {"name": "create", "method": "POST", "endpoint": "/items",
                 "body": {"name": "widget"}, "expected_status": 201,
                 "expected_response": {"name": "widget"}, "save_response_field": "item_id"},
                {"name": "list", "endpoint": "/items", "expected_items": expected_items}
            ]
        }]
    });
    let path = dir.join("cases.json");
    std::fs::write(&path, serde_json::to_string_pretty(&suite).unwrap()).unwrap();
    path
}

fn fast_timeouts() -> ServiceTimeouts {
    ServiceTimeouts {
        build: Duration::from_secs(10),
        startup: Duration::from_secs(10),
        shutdown: Duration::from_secs(10),
        health: Duration::from_secs(5),
        check_interval: Duration::from_millis(100),
    }
}

/// Project layout: `root/source`, `root/output`, scripts in `root`.
fn setup(temp: &TempDir) -> TranslationJob {
    let source = sample_project(temp.path());
    write_script(temp.path(), "start.sh", "echo started > started.marker");
    write_script(temp.path(), "shutdown.sh", "touch stopped.marker");
    TranslationJob::new(source, temp.path().join("output"), "python", "go")
}

#[tokio::test]
async fn test_translated_project_passes_verification() {
    let temp = TempDir::new().unwrap();
    let job = setup(&temp);
    let base_url = spawn_service().await;
    let cases = write_suite(temp.path(), &base_url, 1);

    let executor = TestExecutor::new(
        ExecutorConfig::new(&cases)
            .with_timeouts(fast_timeouts())
            .with_request_timeout(Duration::from_secs(5)),
    );
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER)]);
    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider)),
        Some(Arc::new(executor)),
        2,
    );

    let outcome = orchestrator.run(&job).await;
    assert!(outcome.success, "{:?}", outcome.retry_attempts);
    assert_eq!(outcome.final_state, RetryState::Succeeded { attempt: 1 });

    let result = outcome.retry_attempts[0].test_result.as_ref().unwrap();
    assert_eq!(
        result.phases,
        vec![
            ExecutorPhase::Validating,
            ExecutorPhase::Starting,
            ExecutorPhase::WaitingReady,
            ExecutorPhase::Testing,
            ExecutorPhase::ShuttingDown,
            ExecutorPhase::Done,
        ]
    );
    let suite = result.suite_result.as_ref().unwrap();
    assert_eq!(suite.passed_scenarios, 1);
    assert_eq!(suite.scenario_results[0].passed_steps, 2);
    assert!(temp.path().join("started.marker").is_file());
    assert!(temp.path().join("stopped.marker").is_file());
}

#[tokio::test]
async fn test_failing_scenario_feeds_back_into_retry() {
    let temp = TempDir::new().unwrap();
    let job = setup(&temp);
    let base_url = spawn_service().await;
    let cases = write_suite(temp.path(), &base_url, 5);

    let executor = TestExecutor::new(ExecutorConfig::new(&cases).with_timeouts(fast_timeouts()));
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER), text_reply(BATCH_ANSWER)]);
    let mut orchestrator = RetryOrchestrator::new(
        Arc::new(BatchTranslator::new(provider.clone())),
        Some(Arc::new(executor)),
        1,
    );

    let outcome = orchestrator.run(&job).await;
    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.final_state, RetryState::Exhausted);

    let errors = &outcome.retry_attempts[0].errors;
    assert!(errors.iter().all(|e| e.kind == ErrorKind::TestFailure));
    assert!(errors
        .iter()
        .any(|e| e.message == "Scenario 'crud' failed: 1/2 steps passed"
            || e.context == "Scenario 'crud' failed: 1/2 steps passed"));
    assert!(errors.iter().any(|e| e.message == "Test step 'list' failed"));

    let retry_instructions = provider.requests()[1][0].text().unwrap().to_string();
    assert!(retry_instructions.contains("Response item count mismatch: expected 5"));
    assert!(temp.path().join("stopped.marker").is_file());
}
