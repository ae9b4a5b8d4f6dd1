//! Batch Translation Protocol
//!
//! The whole source tree goes out in one request and the whole translated
//! project comes back in one answer. Model answers routinely embed raw code
//! (quotes, backticks, newlines) in `content` fields, so the file array is
//! recovered positionally instead of with a JSON decoder.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

use project_translator_tools::{collect_source_files, DEFAULT_EXCLUDED_DIRS};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Request
// ============================================================================

/// One source file included in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Path relative to the source root, `/`-separated
    pub path: String,
    pub content: String,
    /// Extension with its leading dot (`.py`), empty when there is none
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTranslationRequest {
    pub source_language: String,
    pub target_language: String,
    pub project_files: Vec<ProjectFile>,
    /// System instructions; retries append feedback here
    pub instructions: String,
}

impl BatchTranslationRequest {
    /// The user message carrying every project file.
    pub fn request_text(&self) -> String {
        let mut text = format!(
            "Please translate this project from {} to {}:\n\nPROJECT FILES ({} files):\n\n",
            self.source_language,
            self.target_language,
            self.project_files.len()
        );
        for (i, file) in self.project_files.iter().enumerate() {
            let _ = write!(
                text,
                "--- FILE {}: {} ({}) ---\n{}\n\n",
                i + 1,
                file.path,
                file.kind,
                file.content
            );
        }
        text
    }
}

/// Snapshot `source_root` into a request.
pub fn create_request(
    source_root: &Path,
    source_language: &str,
    target_language: &str,
) -> AppResult<BatchTranslationRequest> {
    let snapshot = collect_source_files(source_root, DEFAULT_EXCLUDED_DIRS)?;
    let project_files: Vec<ProjectFile> = snapshot
        .files
        .into_iter()
        .map(|f| {
            let kind = Path::new(&f.relative_path)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            ProjectFile {
                path: f.relative_path,
                content: f.content,
                kind,
            }
        })
        .collect();

    tracing::info!(
        files = project_files.len(),
        skipped = snapshot.skipped.len(),
        "created batch translation request"
    );

    Ok(BatchTranslationRequest {
        source_language: source_language.to_string(),
        target_language: target_language.to_string(),
        project_files,
        instructions: translation_instructions(source_language, target_language),
    })
}

/// System instructions for a batch translation.
pub fn translation_instructions(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are an expert project translator. Your task is to translate a project from {src} to {dst} while maintaining exact functionality.

CRITICAL REQUIREMENTS:
1. The translated project must be a Docker containerized REST API
2. The API behavior must be EXACTLY the same as the original
3. The Dockerfile must use port 8000
4. All functionalities must be preserved
5. The project structure should be adapted to {dst} conventions
6. The project must be able to be built and run with Docker without any other tools

RESPONSE FORMAT:
You must respond with a JSON object containing:
{{
    "translated_files": [
        {{
            "path": "relative/path/to/file",
            "content": "file content here",
            "original_path": "original/path/to/file"
        }}
    ],
    "translation_summary": "Brief summary of what was translated",
    "warnings": ["any warnings or notes about the translation"]
}}

TRANSLATION GUIDELINES:
1. Translate all source code files to {dst}
2. Update dependency files (requirements.txt, package.json, etc.) for {dst}
3. Update Dockerfile to use appropriate {dst} base image
4. Maintain the same API endpoints and behavior
5. Preserve all configuration settings
6. Update documentation if present
7. Ensure the project can be built and run with Docker
8. If the target language needs to be compiled, consider using a multi-stage build Dockerfile

IMPORTANT: Respond ONLY with the JSON object. Do not include any other text or explanations."#,
        src = source_language,
        dst = target_language
    )
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTranslationResponse {
    pub translated_files: Vec<TranslatedFile>,
    pub translation_summary: String,
    pub warnings: Vec<String>,
}

struct ResponsePatterns {
    content_start: Regex,
    content_end: Regex,
    path: Regex,
    summary: Regex,
    warnings: Regex,
    quoted: Regex,
}

fn patterns() -> Option<&'static ResponsePatterns> {
    static PATTERNS: OnceLock<Option<ResponsePatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(ResponsePatterns {
                content_start: Regex::new(r#""content":\s*(`|")"#).ok()?,
                content_end: Regex::new(r#"(`|")\s*,\s*"original_path""#).ok()?,
                path: Regex::new(r#""path":\s*"([^"]+)""#).ok()?,
                summary: Regex::new(r#""translation_summary":\s*"((?:[^"\\]|\\.)*)""#).ok()?,
                warnings: Regex::new(r#""warnings":\s*\[([^\]]*)\]"#).ok()?,
                quoted: Regex::new(r#""((?:[^"\\]|\\.)*)""#).ok()?,
            })
        })
        .as_ref()
}

/// Recover a `BatchTranslationResponse` from raw model text.
///
/// The i-th `"path"` is paired with the i-th content start and the i-th
/// content end (the quote or backtick before `"original_path"`). Everything
/// between them is taken verbatim and then unescaped. Paths without a
/// complete span are dropped.
pub fn parse_response(raw_text: &str) -> AppResult<BatchTranslationResponse> {
    let (Some(start), Some(end)) = (raw_text.find('{'), raw_text.rfind('}')) else {
        return Err(AppError::translation("No JSON object found in response"));
    };
    if end < start {
        return Err(AppError::translation("No JSON object found in response"));
    }
    let json = &raw_text[start..=end];
    let p = patterns().ok_or_else(|| AppError::translation("Response patterns unavailable"))?;

    let starts: Vec<usize> = p.content_start.find_iter(json).map(|m| m.end()).collect();
    let ends: Vec<usize> = p.content_end.find_iter(json).map(|m| m.start()).collect();

    let mut translated_files = Vec::new();
    for (i, caps) in p.path.captures_iter(json).enumerate() {
        let (Some(&from), Some(&to)) = (starts.get(i), ends.get(i)) else {
            tracing::warn!(index = i, "file path without a content span");
            continue;
        };
        let Some(content) = json.get(from..to) else {
            tracing::warn!(index = i, "content span out of order");
            continue;
        };
        translated_files.push(TranslatedFile {
            path: caps[1].to_string(),
            content: unescape_content(content),
        });
    }

    let translation_summary = p
        .summary
        .captures(json)
        .map(|c| unescape_content(&c[1]))
        .unwrap_or_default();
    let warnings = p
        .warnings
        .captures(json)
        .map(|c| {
            p.quoted
                .captures_iter(&c[1])
                .map(|q| unescape_content(&q[1]))
                .collect()
        })
        .unwrap_or_default();

    tracing::info!(files = translated_files.len(), "parsed batch translation response");
    Ok(BatchTranslationResponse {
        translated_files,
        translation_summary,
        warnings,
    })
}

/// Undo the escapes models put in `content`: `\n`, `\"`, `\'`, `` \` ``,
/// then `\\`, in that order.
pub fn unescape_content(content: &str) -> String {
    content
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\`", "`")
        .replace("\\\\", "\\")
}

/// Structural problems that make a response unusable.
pub fn validate(response: &BatchTranslationResponse) -> Vec<String> {
    let mut errors = Vec::new();
    if response.translated_files.is_empty() {
        errors.push("No translated files provided".to_string());
    }
    for (i, file) in response.translated_files.iter().enumerate() {
        if file.path.trim().is_empty() {
            errors.push(format!("File {}: Missing file path", i + 1));
        }
        if file.content.is_empty() {
            errors.push(format!("File {}: Missing file content", i + 1));
        }
    }
    errors
}
