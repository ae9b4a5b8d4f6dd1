//! Error Analyzer
//!
//! Classifies build, startup and test failures and renders them as feedback
//! text for the next translation attempt. Suggestions are advisory text only.

use std::fmt::Write as _;

use project_translator_verify::{StepResult, SuiteResult, TestExecutionResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Longest context excerpt rendered into feedback.
const MAX_CONTEXT_CHARS: usize = 500;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BuildError,
    CompileError,
    RuntimeError,
    TestFailure,
    ServiceStartupError,
    DependencyError,
    SyntaxError,
    ConfigurationError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BuildError => "build_error",
            ErrorKind::CompileError => "compile_error",
            ErrorKind::RuntimeError => "runtime_error",
            ErrorKind::TestFailure => "test_failure",
            ErrorKind::ServiceStartupError => "service_startup_error",
            ErrorKind::DependencyError => "dependency_error",
            ErrorKind::SyntaxError => "syntax_error",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::UnknownError => "unknown_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            line: None,
            context: context.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions
            .extend(suggestions.iter().map(|s| s.to_string()));
        self
    }
}

// ============================================================================
// Analyzer
// ============================================================================

pub struct ErrorAnalyzer {
    groups: Vec<(ErrorKind, Vec<Regex>)>,
    locations: Vec<Regex>,
}

const PATTERN_GROUPS: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::BuildError,
        &[
            r"build failed",
            r"docker build.*failed",
            r"dockerfile.*error",
            r"build.*error",
            r"failed to build",
        ],
    ),
    (
        ErrorKind::CompileError,
        &[
            r"compilation.*error",
            r"syntax.*error",
            r"parse.*error",
            r"compiler.*error",
            r"javac.*error",
            r"gcc.*error",
            r"g\+\+.*error",
        ],
    ),
    (
        ErrorKind::RuntimeError,
        &[
            r"runtime.*error",
            r"exception",
            r"segmentation fault",
            r"null pointer",
            r"index out of bounds",
            r"connection.*refused",
            r"port.*already.*in.*use",
        ],
    ),
    (
        ErrorKind::DependencyError,
        &[
            r"module.*not.*found",
            r"package.*not.*found",
            r"import.*error",
            r"dependency.*error",
            r"cannot.*find.*module",
        ],
    ),
    (
        ErrorKind::SyntaxError,
        &[
            r"syntaxerror",
            r"invalid syntax",
            r"unexpected token",
            r"missing.*semicolon",
        ],
    ),
    (
        ErrorKind::ConfigurationError,
        &[
            r"config.*error",
            r"environment.*variable",
            r"missing.*config",
            r"invalid.*configuration",
        ],
    ),
];

const LOCATION_PATTERNS: &[&str] = &[
    r"([^:\s]+):(\d+):",
    r"([^:\s]+)\((\d+)\):",
    r"at\s+([^:\s]+):(\d+)",
];

impl Default for ErrorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorAnalyzer {
    pub fn new() -> Self {
        let groups = PATTERN_GROUPS
            .iter()
            .map(|(kind, patterns)| {
                (
                    *kind,
                    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
                )
            })
            .collect();
        let locations = LOCATION_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { groups, locations }
    }

    /// First pattern group matching `text` (case-insensitive).
    pub fn detect_kind(&self, text: &str) -> Option<ErrorKind> {
        let lower = text.to_lowercase();
        self.groups
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(&lower)))
            .map(|(kind, _)| *kind)
    }

    /// Classify `text`.
    ///
    /// Build, compile and runtime hints force their analyzer. Any other hint
    /// is only used when no pattern group matches, in place of
    /// `unknown_error`.
    pub fn classify(&self, text: &str, hint: Option<ErrorKind>) -> ErrorInfo {
        match hint {
            Some(ErrorKind::BuildError) => return self.analyze_build(text),
            Some(ErrorKind::CompileError) => return self.analyze_compile(text),
            Some(ErrorKind::RuntimeError) => return self.analyze_runtime(text),
            _ => {}
        }

        match self.detect_kind(text) {
            Some(ErrorKind::BuildError) => self.analyze_build(text),
            Some(ErrorKind::CompileError) => self.analyze_compile(text),
            Some(ErrorKind::RuntimeError) => self.analyze_runtime(text),
            Some(kind) => ErrorInfo::new(kind, format!("Error detected: {}", kind), text)
                .with_suggestion(format!("Investigate {}", kind.as_str().replace('_', " "))),
            None => match hint {
                Some(ErrorKind::ServiceStartupError) => {
                    ErrorInfo::new(ErrorKind::ServiceStartupError, "Service failed to start", text)
                        .with_suggestions(&[
                            "Check the start script and container logs",
                            "Verify the service listens on port 8000",
                            "Make sure a /health endpoint answers 200",
                        ])
                }
                Some(ErrorKind::TestFailure) => {
                    ErrorInfo::new(ErrorKind::TestFailure, "Tests failed", text)
                        .with_suggestions(&["Compare endpoint behavior with the original service"])
                }
                _ => ErrorInfo::new(ErrorKind::UnknownError, "Unknown error occurred", text)
                    .with_suggestions(&["Review error output for specific issues"]),
            },
        }
    }

    pub fn analyze_build(&self, text: &str) -> ErrorInfo {
        let lower = text.to_lowercase();
        let mut info = ErrorInfo::new(ErrorKind::BuildError, "Build process failed", text);
        if lower.contains("dockerfile") {
            info = info.with_suggestions(&[
                "Check Dockerfile syntax and base image",
                "Ensure all required files are copied correctly",
                "Verify build context includes all necessary files",
            ]);
        }
        if lower.contains("permission") {
            info = info.with_suggestions(&["Check file permissions and ownership"]);
        }
        if lower.contains("no such file") {
            info = info.with_suggestions(&["Verify all referenced files exist in the build context"]);
        }
        if lower.contains("port") {
            info = info.with_suggestions(&["Check port configuration and availability"]);
        }
        info
    }

    pub fn analyze_compile(&self, text: &str) -> ErrorInfo {
        let lower = text.to_lowercase();
        let mut info = ErrorInfo::new(ErrorKind::CompileError, "Compilation failed", text);

        if let Some(caps) = self.locations.iter().find_map(|p| p.captures(text)) {
            info.file = Some(caps[1].to_string());
            info.line = caps[2].parse().ok();
        }

        if lower.contains("java") || lower.contains("javac") {
            info.with_suggestions(&[
                "Check Java syntax and imports",
                "Verify classpath and dependencies",
                "Ensure proper package declarations",
            ])
        } else if lower.contains("javascript") || lower.contains("node") {
            info.with_suggestions(&[
                "Check JavaScript syntax",
                "Verify module imports and exports",
                "Check for missing semicolons or brackets",
            ])
        } else if lower.contains("python") {
            info.with_suggestions(&[
                "Check Python syntax and indentation",
                "Verify import statements",
                "Check for missing colons or parentheses",
            ])
        } else {
            info
        }
    }

    pub fn analyze_runtime(&self, text: &str) -> ErrorInfo {
        let lower = text.to_lowercase();
        let info = ErrorInfo::new(ErrorKind::RuntimeError, "Runtime error occurred", text);
        if lower.contains("connection refused") {
            info.with_suggestions(&[
                "Check if the service is running on the correct port",
                "Verify network configuration",
                "Check firewall settings",
            ])
        } else if lower.contains("port") && lower.contains("already in use") {
            info.with_suggestions(&[
                "Change the port number in configuration",
                "Stop other services using the same port",
                "Check for zombie processes",
            ])
        } else if lower.contains("null pointer") {
            info.with_suggestions(&[
                "Check for null value handling",
                "Add null checks before object access",
                "Verify object initialization",
            ])
        } else if lower.contains("out of memory") {
            info.with_suggestions(&[
                "Increase memory allocation",
                "Check for memory leaks",
                "Optimize memory usage",
            ])
        } else {
            info
        }
    }

    /// One `test_failure` per failed step.
    pub fn analyze_test_failures(&self, result: &SuiteResult) -> Vec<ErrorInfo> {
        result
            .failed_scenarios()
            .flat_map(|scenario| scenario.failed_steps())
            .map(step_failure)
            .collect()
    }

    /// Every error of a verification run, in build, service, test order.
    pub fn analyze_execution(&self, result: &TestExecutionResult) -> Vec<ErrorInfo> {
        let mut errors: Vec<ErrorInfo> = result
            .build_errors
            .iter()
            .map(|e| self.classify(e, Some(ErrorKind::BuildError)))
            .collect();
        errors.extend(
            result
                .service_errors
                .iter()
                .map(|e| self.classify(e, Some(ErrorKind::ServiceStartupError))),
        );
        errors.extend(
            result
                .test_errors
                .iter()
                .map(|e| self.classify(e, Some(ErrorKind::TestFailure))),
        );
        if let Some(suite) = &result.suite_result {
            errors.extend(self.analyze_test_failures(suite));
        }
        errors
    }
}

fn step_failure(step: &StepResult) -> ErrorInfo {
    let mut haystack = step.error.clone().unwrap_or_default();
    for error in &step.validation_errors {
        haystack.push('\n');
        haystack.push_str(error);
    }
    let haystack = haystack.to_lowercase();

    let mut info = ErrorInfo::new(
        ErrorKind::TestFailure,
        format!("Test step '{}' failed", step.step_name),
        serde_json::to_string_pretty(step).unwrap_or_default(),
    );
    if haystack.contains("status") {
        info = info.with_suggestions(&["Check HTTP status code handling"]);
    }
    if haystack.contains("timeout") || haystack.contains("timed out") {
        info = info.with_suggestions(&["Increase timeout or check service responsiveness"]);
    }
    if haystack.contains("connection") {
        info = info.with_suggestions(&["Verify service connectivity and configuration"]);
    }
    info
}

/// Render `errors` as the feedback block handed to the next attempt.
pub fn generate_feedback(errors: &[ErrorInfo]) -> String {
    if errors.is_empty() {
        return "No errors detected.".to_string();
    }

    let mut out = String::from("TRANSLATION ERRORS DETECTED:\n\n");
    for (i, error) in errors.iter().enumerate() {
        let _ = writeln!(out, "ERROR {}: {}", i + 1, error.kind.as_str().to_uppercase());
        let _ = writeln!(out, "Message: {}", error.message);
        if let Some(file) = &error.file {
            let _ = writeln!(out, "File: {}", file);
        }
        if let Some(line) = error.line {
            let _ = writeln!(out, "Line: {}", line);
        }
        if !error.context.is_empty() {
            let _ = writeln!(out, "Context: {}", truncate_context(&error.context));
        }
        if !error.suggestions.is_empty() {
            out.push_str("Suggestions:\n");
            for suggestion in &error.suggestions {
                let _ = writeln!(out, "  - {}", suggestion);
            }
        }
        out.push('\n');
    }
    out.push_str("\nPlease fix these errors and provide an updated translation.\n");
    out.push_str("Focus on the specific issues mentioned above.\n");
    out
}

fn truncate_context(context: &str) -> String {
    if context.chars().count() > MAX_CONTEXT_CHARS {
        let head: String = context.chars().take(MAX_CONTEXT_CHARS).collect();
        format!("{}...", head)
    } else {
        context.to_string()
    }
}
