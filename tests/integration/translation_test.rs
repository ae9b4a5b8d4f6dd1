//! Translation Engine Integration Tests
//!
//! Drives the batch and iterative engines against a scripted provider and a
//! real temporary source tree.

use std::sync::Arc;
use std::time::Duration;

use project_translator::services::translation::iterative::CONTINUE_NUDGE;
use project_translator::services::translation::{
    BatchTranslator, ConversationLog, IterativeSettings, IterativeTranslator, SessionMetadata,
    SessionOutcome, TranslationEngine, TranslationJob, TranslationStats,
};
use project_translator_llm::{ConversationMessage, MessageBody, MessageRole};
use serde_json::json;
use tempfile::TempDir;

use crate::support::{
    reply, sample_project, server_error, text_reply, ScriptedProvider, BATCH_ANSWER,
};

fn job(temp: &TempDir) -> TranslationJob {
    let source = sample_project(temp.path());
    TranslationJob::new(source, temp.path().join("output"), "python", "go")
}

fn fast_settings(max_iterations: u32) -> IterativeSettings {
    IterativeSettings {
        max_iterations,
        iteration_delay: Duration::ZERO,
        auto_save_interval: 2,
    }
}

// ============================================================================
// Batch engine
// ============================================================================

#[tokio::test]
async fn test_batch_engine_writes_translated_files() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply(BATCH_ANSWER)]);
    let engine = BatchTranslator::new(provider.clone());

    let stats = engine.translate(&job, None).await.unwrap();
    let TranslationStats::Batch(stats) = stats else {
        panic!("expected batch stats");
    };
    assert_eq!(stats.files_translated, 2);
    assert_eq!(stats.files_written, 2);
    assert_eq!(stats.write_errors, 0);
    assert_eq!(stats.warnings, vec!["check route ordering"]);
    assert_eq!(stats.summary, "Flask app ported to net/http");
    assert_eq!(stats.usage.input_tokens, 100);

    let main_go = std::fs::read_to_string(job.output_root.join("main.go")).unwrap();
    assert_eq!(main_go, "package main\n\nfunc main() {\n    println(\"hi\")\n}\n");
    assert!(job.output_root.join("Dockerfile").is_file());

    // One request: system instructions plus the project listing.
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let [system, user] = requests[0].as_slice() else {
        panic!("expected two messages");
    };
    assert_eq!(system.role(), MessageRole::System);
    let listing = user.text().unwrap();
    assert!(listing.starts_with("Please translate this project from python to go:"));
    assert!(listing.contains("--- FILE 1: Dockerfile () ---"));
    assert!(listing.contains("app.py (.py)"));
    assert!(!listing.contains("__pycache__"));
}

#[tokio::test]
async fn test_batch_engine_rejects_unparseable_answer() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![text_reply("Sorry, I cannot help with that.")]);

    let err = BatchTranslator::new(provider)
        .translate(&job, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No JSON object found in response"));
    assert!(!job.output_root.join("main.go").exists());
}

#[tokio::test]
async fn test_batch_engine_counts_escaping_paths_as_write_errors() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let answer = r#"{"translated_files": [
        {"path": "../escape.go", "content": "package evil", "original_path": "app.py"},
        {"path": "ok.go", "content": "package ok", "original_path": "app.py"}
    ], "translation_summary": "partial", "warnings": []}"#;
    let provider = ScriptedProvider::new(vec![text_reply(answer)]);

    let stats = BatchTranslator::new(provider)
        .translate(&job, None)
        .await
        .unwrap();
    let TranslationStats::Batch(stats) = stats else {
        panic!("expected batch stats");
    };
    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.write_errors, 1);
    assert!(!temp.path().join("escape.go").exists());
}

#[tokio::test]
async fn test_batch_engine_surfaces_provider_errors() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![server_error()]);

    let err = BatchTranslator::new(provider)
        .translate(&job, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("upstream overloaded"));
}

#[tokio::test]
async fn test_batch_engine_records_conversation_log() {
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
    let mut log =
        ConversationLog::create(&temp.path().join("logs"), Some("session.json"), metadata).unwrap();

    BatchTranslator::new(provider)
        .translate(&job, Some(&mut log))
        .await
        .unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(log.path()).unwrap()).unwrap();
    assert_eq!(saved["metadata"]["translation_type"], "batch");
    assert_eq!(saved["conversation"].as_array().unwrap().len(), 3);
    assert!(saved["raw_responses"][0]
        .as_str()
        .unwrap()
        .contains("translated_files"));
}

#[tokio::test]
async fn test_batch_engine_survives_log_save_failure() {
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
    let logs = temp.path().join("logs");
    let mut log = ConversationLog::create(&logs, Some("session.json"), metadata).unwrap();
    // A regular file where the log directory was makes every later save fail.
    std::fs::remove_dir_all(&logs).unwrap();
    std::fs::write(&logs, "not a directory").unwrap();
    assert!(log.save().is_err());

    let stats = BatchTranslator::new(provider)
        .translate(&job, Some(&mut log))
        .await
        .unwrap();

    let TranslationStats::Batch(stats) = stats else {
        panic!("expected batch stats");
    };
    assert_eq!(stats.files_written, 2);
    assert!(job.output_root.join("main.go").is_file());
}

// ============================================================================
// Iterative engine
// ============================================================================

#[tokio::test]
async fn test_iterative_session_completes() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![
        Ok(reply(vec![ConversationMessage::tool_call(
            "c1",
            "list_directory",
            json!({"directory_path": "/"}),
        )])),
        Ok(reply(vec![ConversationMessage::tool_call(
            "c2",
            "get_file",
            json!({"file_path": "app.py"}),
        )])),
        Ok(reply(vec![
            ConversationMessage::assistant("Writing the Go version now."),
            ConversationMessage::tool_call(
                "c3",
                "write_file",
                json!({"file_path": "cmd/main.go", "content": "package main\n"}),
            ),
            ConversationMessage::tool_call(
                "c4",
                "translation_complete",
                json!({"translation_summary": "ported"}),
            ),
        ])),
    ]);
    let engine = IterativeTranslator::new(provider.clone(), fast_settings(10));

    let result = engine.run(&job, None).await;
    assert_eq!(
        result.outcome,
        SessionOutcome::Complete {
            summary: "ported".to_string()
        }
    );
    assert_eq!(result.stats.iterations, 3);
    assert_eq!(result.stats.tools.tool_calls, 4);
    assert_eq!(result.stats.tools.files_read, 1);
    assert_eq!(result.stats.tools.files_written, 1);
    assert_eq!(result.stats.tools.tool_errors, 0);
    assert_eq!(result.stats.usage.output_tokens, 150);
    assert!(result.conversation.is_balanced());
    assert_eq!(
        std::fs::read_to_string(job.output_root.join("cmd/main.go")).unwrap(),
        "package main\n"
    );

    // The second request carries the answer to the first call, same id.
    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    let answer = requests[1].last().unwrap();
    assert_eq!(answer.id, "c1");
    let MessageBody::ToolResult { content, is_error } = &answer.body else {
        panic!("expected tool result");
    };
    assert!(!is_error);
    let listing: serde_json::Value = serde_json::from_str(content).unwrap();
    let names: Vec<&str> = listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"app.py"));
}

#[tokio::test]
async fn test_iterative_session_exhausts_budget() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![
        text_reply("Let me think."),
        text_reply("Still thinking."),
        text_reply("Almost."),
    ]);
    let engine = IterativeTranslator::new(provider.clone(), fast_settings(3));

    let result = engine.run(&job, None).await;
    assert_eq!(result.outcome, SessionOutcome::Exhausted { iterations: 3 });

    // Each text-only answer is followed by the nudge.
    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].last().unwrap().text(), Some(CONTINUE_NUDGE));

    let err = IterativeTranslator::new(
        ScriptedProvider::new(vec![text_reply("no")]),
        fast_settings(1),
    )
    .translate(&job, None)
    .await
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("Translation did not complete within 1 iterations"));
}

#[tokio::test]
async fn test_iterative_session_recovers_from_provider_error() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![
        server_error(),
        Ok(reply(vec![ConversationMessage::tool_call(
            "done",
            "translation_complete",
            json!({"translation_summary": "ok"}),
        )])),
    ]);
    let engine = IterativeTranslator::new(provider.clone(), fast_settings(5));

    let result = engine.run(&job, None).await;
    assert!(result.outcome.is_complete());
    assert_eq!(result.stats.provider_errors, 1);
    assert_eq!(result.stats.iterations, 2);

    let requests = provider.requests();
    let notice = requests[1].last().unwrap();
    assert_eq!(notice.role(), MessageRole::User);
    assert_eq!(
        notice.text(),
        Some("Error occurred: Server error (503): upstream overloaded. Please continue with the translation.")
    );
}

#[tokio::test]
async fn test_iterative_answers_calls_after_completion() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp);
    let provider = ScriptedProvider::new(vec![Ok(reply(vec![
        ConversationMessage::tool_call("a", "translation_complete", json!({"translation_summary": "x"})),
        ConversationMessage::tool_call("b", "get_file", json!({"file_path": "../secrets"})),
        ConversationMessage::tool_call("c", "launch_rocket", json!({})),
    ]))]);
    let engine = IterativeTranslator::new(provider, fast_settings(5));

    let result = engine.run(&job, None).await;
    assert!(result.outcome.is_complete());
    assert!(result.conversation.is_balanced());
    assert_eq!(result.stats.tools.tool_calls, 3);
    assert_eq!(result.stats.tools.tool_errors, 2);

    let unknown = result
        .conversation
        .messages()
        .iter()
        .find(|m| m.id == "c" && m.role() == MessageRole::ToolResult)
        .unwrap();
    let MessageBody::ToolResult { content, is_error } = &unknown.body else {
        panic!("expected tool result");
    };
    assert!(is_error);
    assert!(content.contains("Unknown tool: launch_rocket"));
}

#[tokio::test]
async fn test_iterative_feedback_and_auto_save() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp).with_feedback("\n\nPrevious attempt: Dockerfile missing.");
    let provider = ScriptedProvider::new(vec![
        text_reply("one"),
        text_reply("two"),
        Ok(reply(vec![ConversationMessage::tool_call(
            "end",
            "translation_complete",
            json!({"translation_summary": "done"}),
        )])),
    ]);
    let metadata = SessionMetadata::new(
        "iterative",
        "python",
        "go",
        &job.source_root,
        &job.output_root,
        "scripted",
        "scripted-model",
    );
    let mut log = ConversationLog::create(&temp.path().join("logs"), None, metadata).unwrap();
    let engine: Arc<dyn TranslationEngine> =
        Arc::new(IterativeTranslator::new(provider.clone(), fast_settings(5)));

    engine.translate(&job, Some(&mut log)).await.unwrap();

    let opening = &provider.requests()[0][1];
    assert!(opening
        .text()
        .unwrap()
        .ends_with("Previous attempt: Dockerfile missing."));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(log.path()).unwrap()).unwrap();
    assert_eq!(saved["summary"]["outcome"]["status"], "complete");
    assert!(saved["conversation"].as_array().unwrap().len() >= 7);
}

#[tokio::test]
async fn test_iterative_missing_source_fails_without_calling_provider() {
    let temp = TempDir::new().unwrap();
    let job = TranslationJob::new(temp.path().join("nope"), temp.path().join("out"), "python", "go");
    let provider = ScriptedProvider::new(vec![]);

    let result = IterativeTranslator::new(provider.clone(), fast_settings(3))
        .run(&job, None)
        .await;
    assert!(matches!(result.outcome, SessionOutcome::Failed { .. }));
    assert!(provider.requests().is_empty());
}
