//! Result Handler
//!
//! Persists a `SuiteResult` as JSON or CSV and derives summary figures and a
//! console report from it.

use std::fmt::Write as _;
use std::path::Path;

use project_translator_core::{write_json_atomic, write_text_atomic, CoreResult};
use serde::{Deserialize, Serialize};

use crate::models::SuiteResult;

/// Save the full result artifact as pretty JSON.
pub fn save_results(result: &SuiteResult, path: &Path) -> CoreResult<()> {
    write_json_atomic(path, result)?;
    tracing::info!(path = %path.display(), "results saved");
    Ok(())
}

/// Export one CSV row per scenario.
pub fn export_csv(result: &SuiteResult, path: &Path) -> CoreResult<()> {
    write_text_atomic(path, &to_csv(result))?;
    tracing::info!(path = %path.display(), "results exported as CSV");
    Ok(())
}

/// Render the CSV text (RFC 4180 quoting, CRLF line endings).
pub fn to_csv(result: &SuiteResult) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &[
            "Scenario",
            "Status",
            "Total Steps",
            "Passed Steps",
            "Failed Steps",
            "Description",
        ],
    );
    for scenario in &result.scenario_results {
        let total = scenario.total_steps.to_string();
        let passed = scenario.passed_steps.to_string();
        let failed = (scenario.total_steps - scenario.passed_steps).to_string();
        push_row(
            &mut out,
            &[
                &scenario.scenario_name,
                if scenario.success { "PASS" } else { "FAIL" },
                &total,
                &passed,
                &failed,
                &scenario.scenario_description,
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Headline figures of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub test_suite: String,
    pub timestamp: String,
    pub overall_success: bool,
    pub total_scenarios: usize,
    pub passed_scenarios: usize,
    pub failed_scenarios: usize,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    /// Percentage of passed scenarios.
    pub success_rate: f64,
}

impl ResultsSummary {
    pub fn from_result(result: &SuiteResult) -> Self {
        let total_scenarios = result.scenario_results.len();
        let passed_scenarios = result.scenario_results.iter().filter(|s| s.success).count();
        let total_steps: usize = result.scenario_results.iter().map(|s| s.total_steps).sum();
        let passed_steps: usize = result.scenario_results.iter().map(|s| s.passed_steps).sum();

        Self {
            test_suite: result.test_suite.clone(),
            timestamp: result.timestamp.clone(),
            overall_success: result.success,
            total_scenarios,
            passed_scenarios,
            failed_scenarios: total_scenarios - passed_scenarios,
            total_steps,
            passed_steps,
            failed_steps: total_steps - passed_steps,
            success_rate: passed_scenarios as f64 / total_scenarios.max(1) as f64 * 100.0,
        }
    }
}

/// Human-readable report: headline figures, per-scenario lines, then the
/// failing steps of each failed scenario.
pub fn render_report(result: &SuiteResult) -> String {
    let mut out = String::new();
    if !result.success {
        if let Some(error) = &result.error {
            let _ = writeln!(out, "Test run failed: {}", error);
            return out;
        }
    }

    let summary = ResultsSummary::from_result(result);
    let _ = writeln!(out, "Test Suite:       {}", summary.test_suite);
    let _ = writeln!(out, "Total Scenarios:  {}", summary.total_scenarios);
    let _ = writeln!(out, "Passed Scenarios: {}", summary.passed_scenarios);
    let _ = writeln!(out, "Failed Scenarios: {}", summary.failed_scenarios);
    let _ = writeln!(out, "Success Rate:     {:.1}%", summary.success_rate);

    out.push_str("\nScenario Details:\n");
    for scenario in &result.scenario_results {
        let _ = writeln!(
            out,
            "  {} {} ({}/{} steps)",
            if scenario.success { "✓" } else { "✗" },
            scenario.scenario_name,
            scenario.passed_steps,
            scenario.total_steps
        );
    }

    let failed: Vec<_> = result.failed_scenarios().collect();
    if !failed.is_empty() {
        out.push_str("\nFailed Scenarios Details:\n");
    }
    for scenario in failed {
        let _ = writeln!(out, "\n✗ {}", scenario.scenario_name);
        if !scenario.scenario_description.is_empty() {
            let _ = writeln!(out, "  {}", scenario.scenario_description);
        }
        for step in scenario.failed_steps() {
            let _ = writeln!(out, "  ✗ {}", step.step_name);
            if let Some(error) = &step.error {
                let _ = writeln!(out, "    Error: {}", error);
            }
            for error in &step.validation_errors {
                let _ = writeln!(out, "    {}", error);
            }
        }
    }
    out
}
