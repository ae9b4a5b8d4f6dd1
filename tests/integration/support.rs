//! Shared fixtures for the integration tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use project_translator_llm::{
    ConversationMessage, LlmError, LlmProvider, LlmResponse, LlmResult, ToolDefinition,
    UsageStats,
};
use project_translator_verify::{ProjectVerifier, TestExecutionResult};

// ============================================================================
// Scripted provider
// ============================================================================

/// Provider that replays queued replies and records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    requests: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<LlmResult<LlmResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send(
        &self,
        messages: &[ConversationMessage],
        _tools: &[ToolDefinition],
    ) -> LlmResult<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(reply(vec![ConversationMessage::assistant("nothing left")])))
    }
}

pub fn reply(messages: Vec<ConversationMessage>) -> LlmResponse {
    LlmResponse {
        messages,
        usage: Some(UsageStats {
            input_tokens: 100,
            output_tokens: 50,
        }),
    }
}

pub fn text_reply(text: &str) -> LlmResult<LlmResponse> {
    Ok(reply(vec![ConversationMessage::assistant(text)]))
}

pub fn server_error() -> LlmResult<LlmResponse> {
    Err(LlmError::ServerError {
        message: "upstream overloaded".to_string(),
        status: Some(503),
    })
}

/// Batch answer translating `app.py` into a Go service plus Dockerfile.
pub const BATCH_ANSWER: &str = r#"Here is the translation:
{
  "translated_files": [
    {"path": "main.go", "content": "package main\n\nfunc main() {\n    println(\"hi\")\n}\n", "original_path": "app.py"},
    {"path": "Dockerfile", "content": "FROM golang:1.22\nEXPOSE 8000\n", "original_path": "Dockerfile"}
  ],
  "translation_summary": "Flask app ported to net/http",
  "warnings": ["check route ordering"]
}"#;

// ============================================================================
// Fake verifier
// ============================================================================

/// Verifier returning queued results, failing when the queue is empty.
pub struct QueuedVerifier {
    results: Mutex<VecDeque<TestExecutionResult>>,
    calls: Mutex<u32>,
}

impl QueuedVerifier {
    pub fn new(results: Vec<TestExecutionResult>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ProjectVerifier for QueuedVerifier {
    async fn verify(&self, _project_dir: &Path) -> TestExecutionResult {
        *self.calls.lock().unwrap() += 1;
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| failed_build("Build failed with return code 1: no verifier result"))
    }
}

pub fn passed() -> TestExecutionResult {
    serde_json::from_value(serde_json::json!({
        "success": true, "build_ok": true, "service_ok": true, "tests_ok": true,
        "build_errors": [], "service_errors": [], "test_errors": [],
        "elapsed": 0.1, "phases": ["validating", "starting", "waiting_ready", "testing", "shutting_down", "done"]
    }))
    .unwrap()
}

pub fn failed_build(error: &str) -> TestExecutionResult {
    serde_json::from_value(serde_json::json!({
        "success": false, "build_ok": false, "service_ok": false, "tests_ok": false,
        "build_errors": [error], "service_errors": [],
        "test_errors": ["Cannot run tests - service failed to start"],
        "elapsed": 0.1, "phases": ["validating", "building", "done"]
    }))
    .unwrap()
}

// ============================================================================
// Sample project
// ============================================================================

/// Small Flask project under `root/source`.
pub fn sample_project(root: &Path) -> std::path::PathBuf {
    let source = root.join("source");
    std::fs::create_dir_all(source.join("__pycache__")).unwrap();
    std::fs::write(
        source.join("app.py"),
        "from flask import Flask\napp = Flask(__name__)\n",
    )
    .unwrap();
    std::fs::write(source.join("requirements.txt"), "flask==3.0\n").unwrap();
    std::fs::write(source.join("Dockerfile"), "FROM python:3.12\nEXPOSE 8000\n").unwrap();
    std::fs::write(source.join("__pycache__/app.cpython-312.pyc"), "junk").unwrap();
    source
}
