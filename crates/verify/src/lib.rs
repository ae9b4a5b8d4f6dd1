//! Project Translator Verification
//!
//! Black-box verification of a translated project: lifecycle scripts, a
//! health probe, and declarative HTTP scenarios.
//!
//! ## Module Organization
//!
//! - `models` - Test-case file and result artifact types
//! - `placeholders` - `{saved_<key>}` substitution over saved response ids
//! - `request_executor` - One HTTP step: dispatch and validation
//! - `runner` - Scenario Test Runner
//! - `service` - Script discovery, bounded script runs, health polling
//! - `report` - JSON/CSV persistence, summaries, console report
//! - `executor` - Build/start/test/shutdown state machine

pub mod executor;
pub mod models;
pub mod placeholders;
pub mod report;
pub mod request_executor;
pub mod runner;
pub mod service;

// ── Test Suite Model ───────────────────────────────────────────────────
pub use models::{
    HttpMethod, ResponseType, ScenarioOverview, ScenarioResult, StepResult, SuiteOverview,
    SuiteResult, TestScenario, TestStep, TestSuite, DEFAULT_BASE_URL,
};
pub use placeholders::SavedData;

// ── Execution ──────────────────────────────────────────────────────────
pub use executor::{ExecutorConfig, ExecutorPhase, ProjectVerifier, TestExecutionResult, TestExecutor};
pub use request_executor::{validate_response, RequestExecutor, ResponseValidation, DEFAULT_REQUEST_TIMEOUT};
pub use runner::ScenarioRunner;
pub use service::{run_script, wait_until_ready, ScriptOutcome, ServiceManager, ServiceScripts, ServiceTimeouts};

// ── Reporting ──────────────────────────────────────────────────────────
pub use report::{export_csv, render_report, save_results, to_csv, ResultsSummary};
