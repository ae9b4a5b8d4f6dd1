//! Translation Tool Catalog
//!
//! The tools offered to the model during an iterative translation session.

use std::collections::HashMap;

use project_translator_llm::{ParameterSchema, ToolDefinition};

/// Every tool the iterative session understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationTool {
    GetFile,
    WriteFile,
    ListDirectory,
    AskQuestion,
    TranslationComplete,
    AnalyzeProject,
}

impl TranslationTool {
    pub const ALL: [TranslationTool; 6] = [
        TranslationTool::GetFile,
        TranslationTool::WriteFile,
        TranslationTool::ListDirectory,
        TranslationTool::AskQuestion,
        TranslationTool::TranslationComplete,
        TranslationTool::AnalyzeProject,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TranslationTool::GetFile => "get_file",
            TranslationTool::WriteFile => "write_file",
            TranslationTool::ListDirectory => "list_directory",
            TranslationTool::AskQuestion => "ask_question",
            TranslationTool::TranslationComplete => "translation_complete",
            TranslationTool::AnalyzeProject => "analyze_project",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            TranslationTool::GetFile => {
                "Read the content of a file from the source project. Paths are relative to the source project root."
            }
            TranslationTool::WriteFile => {
                "Write a translated file into the output project. Parent directories are created automatically."
            }
            TranslationTool::ListDirectory => {
                "List files and directories of the source project. Use \"/\" for the project root."
            }
            TranslationTool::AskQuestion => {
                "Ask a clarifying question about the translation. No human is available; prefer exploring with the other tools."
            }
            TranslationTool::TranslationComplete => {
                "Signal that every file has been translated and written. Call exactly once, at the end."
            }
            TranslationTool::AnalyzeProject => {
                "Summarize the source project: type, entry points, dependencies, Docker configuration and tests."
            }
        }
    }

    fn schema(self) -> ParameterSchema {
        let mut properties = HashMap::new();
        let required: Vec<&str> = match self {
            TranslationTool::GetFile => {
                properties.insert(
                    "file_path".to_string(),
                    ParameterSchema::string(Some("Path of the file relative to the source root")),
                );
                vec!["file_path"]
            }
            TranslationTool::WriteFile => {
                properties.insert(
                    "file_path".to_string(),
                    ParameterSchema::string(Some("Path of the file relative to the output root")),
                );
                properties.insert(
                    "content".to_string(),
                    ParameterSchema::string(Some("Complete file content")),
                );
                vec!["file_path", "content"]
            }
            TranslationTool::ListDirectory => {
                properties.insert(
                    "directory_path".to_string(),
                    ParameterSchema::string(Some("Directory relative to the source root, \"/\" for the root")),
                );
                vec!["directory_path"]
            }
            TranslationTool::AskQuestion => {
                properties.insert(
                    "question".to_string(),
                    ParameterSchema::string(Some("The question to ask")),
                );
                vec!["question"]
            }
            TranslationTool::TranslationComplete => {
                properties.insert(
                    "translation_summary".to_string(),
                    ParameterSchema::string(Some("Summary of what was translated and any caveats")),
                );
                vec!["translation_summary"]
            }
            TranslationTool::AnalyzeProject => vec![],
        };
        ParameterSchema::object(
            None,
            properties,
            required.into_iter().map(String::from).collect(),
        )
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }
}

/// The full tool catalog in a stable order.
pub fn translation_tools() -> Vec<ToolDefinition> {
    TranslationTool::ALL
        .into_iter()
        .map(TranslationTool::definition)
        .collect()
}
