//! Tool Executor Core Types
//!
//! Result and bookkeeping types for translation tool execution.

use serde::{Deserialize, Serialize};

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create a successful result whose output is a JSON payload
    pub fn ok_json(payload: serde_json::Value) -> Self {
        Self::ok(payload.to_string())
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Convert to string for LLM consumption.
    ///
    /// Failures are rendered as `{"success": false, "error": ...}` so the model
    /// sees the same shape for every tool.
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            serde_json::json!({
                "success": false,
                "error": self.error.as_deref().unwrap_or("Unknown error"),
            })
            .to_string()
        }
    }
}

/// Counters kept across a translation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStats {
    pub files_read: u32,
    pub files_written: u32,
    pub tool_calls: u32,
    pub tool_errors: u32,
}
