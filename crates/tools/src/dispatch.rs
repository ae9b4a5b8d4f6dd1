//! Tool Dispatch
//!
//! Routes a model tool call to the file sandbox or to a session-level
//! handler. Every failure comes back as an error `ToolResult`; nothing here
//! aborts a session.

use serde_json::{json, Value};

use crate::analysis::ProjectAnalyzer;
use crate::catalog::TranslationTool;
use crate::executor::{ToolResult, ToolStats};
use crate::file_access::FileAccess;

/// Canned answer to `ask_question`; there is no human in the loop.
pub const ASK_QUESTION_RESPONSE: &str = "Please continue with the translation. If you need specific information, use the available tools to explore the project structure.";

/// Outcome of one dispatched call.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub result: ToolResult,
    /// Set when the call was `translation_complete`
    pub completion: Option<String>,
}

impl ToolOutcome {
    fn result(result: ToolResult) -> Self {
        Self {
            result,
            completion: None,
        }
    }
}

fn missing_param_error(param: &str) -> ToolResult {
    ToolResult::err(format!("Missing required parameter: {}", param))
}

fn str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.as_str())
}

/// Tool handlers bound to one sandbox, with session counters.
pub struct TranslationToolset {
    files: FileAccess,
    stats: ToolStats,
}

impl TranslationToolset {
    pub fn new(files: FileAccess) -> Self {
        Self {
            files,
            stats: ToolStats::default(),
        }
    }

    pub fn files(&self) -> &FileAccess {
        &self.files
    }

    pub fn stats(&self) -> ToolStats {
        self.stats
    }

    /// Execute `name` with `arguments`.
    pub fn dispatch(&mut self, name: &str, arguments: &Value) -> ToolOutcome {
        self.stats.tool_calls += 1;
        let outcome = self.dispatch_inner(name, arguments);
        if !outcome.result.success {
            self.stats.tool_errors += 1;
            tracing::warn!(
                tool = name,
                error = outcome.result.error.as_deref().unwrap_or(""),
                "tool call failed"
            );
        }
        outcome
    }

    fn dispatch_inner(&mut self, name: &str, arguments: &Value) -> ToolOutcome {
        let Some(tool) = TranslationTool::from_name(name) else {
            return ToolOutcome::result(ToolResult::err(format!("Unknown tool: {}", name)));
        };
        if !arguments.is_object() && !arguments.is_null() {
            return ToolOutcome::result(ToolResult::err(
                "Invalid tool arguments: expected a JSON object",
            ));
        }

        match tool {
            TranslationTool::GetFile => ToolOutcome::result(self.get_file(arguments)),
            TranslationTool::WriteFile => ToolOutcome::result(self.write_file(arguments)),
            TranslationTool::ListDirectory => ToolOutcome::result(self.list_directory(arguments)),
            TranslationTool::AskQuestion => {
                if let Some(question) = str_arg(arguments, "question") {
                    tracing::info!(question, "model asked a question");
                }
                ToolOutcome::result(ToolResult::ok_json(json!({
                    "success": true,
                    "response": ASK_QUESTION_RESPONSE,
                })))
            }
            TranslationTool::TranslationComplete => {
                let summary = str_arg(arguments, "translation_summary")
                    .unwrap_or("")
                    .to_string();
                ToolOutcome {
                    result: ToolResult::ok_json(json!({
                        "success": true,
                        "message": "Translation marked as complete",
                    })),
                    completion: Some(summary),
                }
            }
            TranslationTool::AnalyzeProject => {
                let analysis = ProjectAnalyzer::new(self.files.source_root()).analyze();
                ToolOutcome::result(ToolResult::ok_json(json!({
                    "success": true,
                    "analysis": analysis,
                })))
            }
        }
    }

    fn get_file(&mut self, args: &Value) -> ToolResult {
        let Some(file_path) = str_arg(args, "file_path") else {
            return missing_param_error("file_path");
        };
        match self.files.read(file_path) {
            Ok(content) => {
                self.stats.files_read += 1;
                ToolResult::ok_json(json!({
                    "success": true,
                    "file_path": file_path,
                    "size": content.len(),
                    "content": content,
                }))
            }
            Err(e) => ToolResult::err(e.to_string()),
        }
    }

    fn write_file(&mut self, args: &Value) -> ToolResult {
        let Some(file_path) = str_arg(args, "file_path") else {
            return missing_param_error("file_path");
        };
        let Some(content) = str_arg(args, "content") else {
            return missing_param_error("content");
        };
        match self.files.write(file_path, content) {
            Ok(written) => {
                self.stats.files_written += 1;
                ToolResult::ok_json(json!({
                    "success": true,
                    "message": "File written successfully",
                    "file_path": written.path,
                    "size": written.bytes,
                }))
            }
            Err(e) => ToolResult::err(e.to_string()),
        }
    }

    fn list_directory(&mut self, args: &Value) -> ToolResult {
        let directory = str_arg(args, "directory_path").unwrap_or("/");
        match self.files.list(directory) {
            Ok(items) => ToolResult::ok_json(json!({
                "success": true,
                "directory_path": directory,
                "items": items,
            })),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}
