//! Test Suite Models
//!
//! The declarative HTTP test-case file and the result artifact produced by
//! running it.

use std::collections::HashMap;
use std::path::Path;

use project_translator_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Base URL used when a suite does not name one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

// ============================================================================
// Enums
// ============================================================================

/// HTTP methods accepted in a test-case file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        };
        write!(f, "{}", name)
    }
}

/// Expected JSON shape of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Array,
    Object,
    String,
    Number,
    Boolean,
}

impl ResponseType {
    /// Whether `value` has this shape
    pub fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            ResponseType::Array => value.is_array(),
            ResponseType::Object => value.is_object(),
            ResponseType::String => value.is_string(),
            ResponseType::Number => value.is_number(),
            ResponseType::Boolean => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseType::Array => "array",
            ResponseType::Object => "object",
            ResponseType::String => "string",
            ResponseType::Number => "number",
            ResponseType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Suite Definition
// ============================================================================

fn default_expected_status() -> u16 {
    200
}

/// One HTTP request plus its expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub name: String,
    #[serde(default)]
    pub method: HttpMethod,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response_contains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response_type: Option<ResponseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_response_field: Option<String>,
}

impl TestStep {
    fn validate(&self, scenario: &str) -> CoreResult<()> {
        if !(100..=599).contains(&self.expected_status) {
            return Err(CoreError::validation(format!(
                "Step '{}' in scenario '{}': status code must be between 100 and 599",
                self.name, scenario
            )));
        }
        if !self.endpoint.starts_with('/') {
            return Err(CoreError::validation(format!(
                "Step '{}' in scenario '{}': endpoint must start with /",
                self.name, scenario
            )));
        }
        Ok(())
    }
}

/// An ordered list of steps sharing a purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<TestStep>,
}

fn default_suite_name() -> String {
    "Unknown Test Suite".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// A complete test-case file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(rename = "test_suite", default = "default_suite_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub scenarios: Vec<TestScenario>,
}

impl TestSuite {
    /// Load and validate a suite from a JSON file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::not_found(format!(
                "Test cases file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a suite from JSON text.
    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let mut suite: TestSuite = serde_json::from_str(content)
            .map_err(|e| CoreError::parse(format!("Invalid test cases file: {}", e)))?;
        suite.normalize()?;
        Ok(suite)
    }

    /// Replace the suite's base URL (e.g. from a CLI flag).
    pub fn with_base_url(mut self, base_url: &str) -> CoreResult<Self> {
        self.base_url = base_url.to_string();
        self.normalize()?;
        Ok(self)
    }

    fn normalize(&mut self) -> CoreResult<()> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(CoreError::validation("Test suite name cannot be empty"));
        }
        if self.scenarios.is_empty() {
            return Err(CoreError::validation(
                "Test suite must have at least one scenario",
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CoreError::validation(
                "Base URL must start with http:// or https://",
            ));
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        for scenario in &mut self.scenarios {
            scenario.name = scenario.name.trim().to_string();
            if scenario.name.is_empty() {
                return Err(CoreError::validation("Scenario name cannot be empty"));
            }
            if scenario.steps.is_empty() {
                return Err(CoreError::validation(format!(
                    "Scenario '{}' must have at least one step",
                    scenario.name
                )));
            }
            for step in &scenario.steps {
                step.validate(&scenario.name)?;
            }
        }
        Ok(())
    }

    /// Find a scenario by name.
    pub fn scenario(&self, name: &str) -> Option<&TestScenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Describe the suite without running it.
    pub fn overview(&self) -> SuiteOverview {
        SuiteOverview {
            test_suite: self.name.clone(),
            description: self.description.clone(),
            base_url: self.base_url.clone(),
            total_scenarios: self.scenarios.len(),
            scenarios: self
                .scenarios
                .iter()
                .map(|s| ScenarioOverview {
                    name: s.name.clone(),
                    description: s.description.clone(),
                    total_steps: s.steps.len(),
                })
                .collect(),
        }
    }
}

/// Static description of a suite (no execution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteOverview {
    pub test_suite: String,
    pub description: String,
    pub base_url: String,
    pub total_scenarios: usize,
    pub scenarios: Vec<ScenarioOverview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOverview {
    pub name: String,
    pub description: String,
    pub total_steps: usize,
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub step_number: usize,
    pub success: bool,
    pub status_code: Option<u16>,
    pub expected_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<serde_json::Value>,
    pub content_match: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_field: Option<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    /// A step that failed before any response was received.
    pub fn failed(step: &TestStep, step_number: usize, error: impl Into<String>) -> Self {
        Self {
            step_name: step.name.clone(),
            step_number,
            success: false,
            status_code: None,
            expected_status: step.expected_status,
            response_data: None,
            content_match: false,
            saved_field: None,
            validation_errors: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub scenario_description: String,
    pub success: bool,
    pub step_results: Vec<StepResult>,
    pub total_steps: usize,
    pub passed_steps: usize,
}

impl ScenarioResult {
    pub fn new(scenario: &TestScenario, step_results: Vec<StepResult>) -> Self {
        let passed_steps = step_results.iter().filter(|s| s.success).count();
        Self {
            scenario_name: scenario.name.clone(),
            scenario_description: scenario.description.clone(),
            success: step_results.iter().all(|s| s.success),
            total_steps: step_results.len(),
            passed_steps,
            step_results,
        }
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.step_results.iter().filter(|s| !s.success)
    }
}

/// Result artifact of running a whole suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub success: bool,
    pub test_suite: String,
    pub total_scenarios: usize,
    pub passed_scenarios: usize,
    pub scenario_results: Vec<ScenarioResult>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuiteResult {
    pub fn from_scenarios(test_suite: &str, scenario_results: Vec<ScenarioResult>) -> Self {
        let passed_scenarios = scenario_results.iter().filter(|s| s.success).count();
        Self {
            success: scenario_results.iter().all(|s| s.success),
            test_suite: test_suite.to_string(),
            total_scenarios: scenario_results.len(),
            passed_scenarios,
            scenario_results,
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: None,
        }
    }

    /// Setup (paths, suite loading) failed before any scenario ran.
    pub fn setup_failed(test_suite: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            test_suite: test_suite.to_string(),
            total_scenarios: 0,
            passed_scenarios: 0,
            scenario_results: Vec::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: Some(error.into()),
        }
    }

    pub fn failed_scenarios(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.scenario_results.iter().filter(|s| !s.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRUD_SUITE: &str = r#"{
        "scenarios": [{
            "name": "crud",
            "steps": [
                {"name": "create", "method": "POST", "endpoint": "/items",
                 "body": {"name": "x"}, "expected_status": 200, "save_response_field": "item1"},
                {"name": "get", "method": "GET", "endpoint": "/items/{saved_item1}",
                 "expected_status": 200, "expected_response_contains": ["name"]}
            ]
        }]
    }"#;

    #[test]
    fn test_parse_defaults() {
        let suite = TestSuite::from_json_str(CRUD_SUITE).unwrap();
        assert_eq!(suite.name, "Unknown Test Suite");
        assert_eq!(suite.base_url, DEFAULT_BASE_URL);
        assert_eq!(suite.scenarios[0].description, "");
        let create = &suite.scenarios[0].steps[0];
        assert_eq!(create.method, HttpMethod::Post);
        assert_eq!(create.save_response_field.as_deref(), Some("item1"));
        let get = &suite.scenarios[0].steps[1];
        assert_eq!(get.expected_response_contains, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_method_defaults_to_get() {
        let suite = TestSuite::from_json_str(
            r#"{"test_suite": "s", "scenarios": [{"name": "a", "steps": [{"name": "h", "endpoint": "/health"}]}]}"#,
        )
        .unwrap();
        let step = &suite.scenarios[0].steps[0];
        assert_eq!(step.method, HttpMethod::Get);
        assert_eq!(step.expected_status, 200);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let suite = TestSuite::from_json_str(
            r#"{"test_suite": "s", "base_url": "http://127.0.0.1:9000/", "scenarios": [{"name": "a", "steps": [{"name": "h", "endpoint": "/"}]}]}"#,
        )
        .unwrap();
        assert_eq!(suite.base_url, "http://127.0.0.1:9000");
        let overridden = suite.with_base_url("https://svc.local/").unwrap();
        assert_eq!(overridden.base_url, "https://svc.local");
    }

    #[test]
    fn test_validation_rejects_bad_suites() {
        let cases = [
            (r#"{"scenarios": []}"#, "at least one scenario"),
            (r#"{"scenarios": [{"name": "a", "steps": []}]}"#, "at least one step"),
            (
                r#"{"scenarios": [{"name": "a", "steps": [{"name": "s", "endpoint": "items"}]}]}"#,
                "endpoint must start with /",
            ),
            (
                r#"{"scenarios": [{"name": "a", "steps": [{"name": "s", "endpoint": "/", "expected_status": 99}]}]}"#,
                "between 100 and 599",
            ),
            (
                r#"{"base_url": "localhost:8000", "scenarios": [{"name": "a", "steps": [{"name": "s", "endpoint": "/"}]}]}"#,
                "Base URL",
            ),
            (
                r#"{"test_suite": "  ", "scenarios": [{"name": "a", "steps": [{"name": "s", "endpoint": "/"}]}]}"#,
                "name cannot be empty",
            ),
        ];
        for (json, expected) in cases {
            let err = TestSuite::from_json_str(json).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{}' in '{}'",
                expected,
                err
            );
        }
    }

    #[test]
    fn test_negative_item_count_rejected() {
        let err = TestSuite::from_json_str(
            r#"{"scenarios": [{"name": "a", "steps": [{"name": "s", "endpoint": "/", "expected_items": -1}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = TestSuite::from_json_str(
            r#"{"scenarios": [{"name": "a", "steps": [{"name": "s", "method": "TRACE", "endpoint": "/"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TestSuite::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_response_type_matches() {
        assert!(ResponseType::Array.matches(&serde_json::json!([1, 2])));
        assert!(!ResponseType::Array.matches(&serde_json::json!({"a": 1})));
        assert!(ResponseType::Object.matches(&serde_json::json!({})));
        assert!(ResponseType::String.matches(&serde_json::json!("ok")));
        assert!(ResponseType::Number.matches(&serde_json::json!(3.5)));
        assert!(ResponseType::Boolean.matches(&serde_json::json!(true)));
    }

    #[test]
    fn test_overview_and_result_aggregation() {
        let suite = TestSuite::from_json_str(CRUD_SUITE).unwrap();
        let overview = suite.overview();
        assert_eq!(overview.total_scenarios, 1);
        assert_eq!(overview.scenarios[0].total_steps, 2);
        assert!(suite.scenario("crud").is_some());
        assert!(suite.scenario("missing").is_none());

        let scenario = &suite.scenarios[0];
        let ok = StepResult {
            success: true,
            status_code: Some(200),
            content_match: true,
            error: None,
            ..StepResult::failed(&scenario.steps[0], 1, "")
        };
        let bad = StepResult::failed(&scenario.steps[1], 2, "connection refused");
        let scenario_result = ScenarioResult::new(scenario, vec![ok, bad]);
        assert!(!scenario_result.success);
        assert_eq!(scenario_result.passed_steps, 1);
        assert_eq!(scenario_result.failed_steps().count(), 1);

        let suite_result = SuiteResult::from_scenarios(&suite.name, vec![scenario_result]);
        assert!(!suite_result.success);
        assert_eq!(suite_result.passed_scenarios, 0);
        assert_eq!(suite_result.failed_scenarios().count(), 1);
    }
}
