//! Project Translator Tools
//!
//! Everything the translation engines use to touch the filesystem:
//! - `FileAccess` - sandboxed reads from the source tree and writes to the output tree
//! - `collect_source_files` - whole-project text snapshot for batch requests
//! - `TranslationTool` / `translation_tools` - the tool catalog offered to the model
//! - `TranslationToolset` - dispatch of model tool calls with session counters
//! - `ProjectAnalyzer` - marker-file based project analysis

pub mod analysis;
pub mod catalog;
pub mod dispatch;
pub mod executor;
pub mod file_access;

// Re-export core types
pub use analysis::{DockerConfig, ProjectAnalysis, ProjectAnalyzer, ProjectKind};
pub use catalog::{translation_tools, TranslationTool};
pub use dispatch::{ToolOutcome, TranslationToolset, ASK_QUESTION_RESPONSE};
pub use executor::{ToolResult, ToolStats};
pub use file_access::{
    collect_source_files, to_slash_path, DirEntryInfo, EntryKind, FileAccess, FileAccessError,
    FileAccessResult, RootKind, SourceFile, SourceSnapshot, WrittenFile, DEFAULT_EXCLUDED_DIRS,
};
