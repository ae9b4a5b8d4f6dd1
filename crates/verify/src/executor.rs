//! Test Executor
//!
//! Drives a translated project through
//! `Validating → Building → Starting → WaitingReady → Testing → ShuttingDown → Done`.
//! Once `Starting` has been entered, `ShuttingDown` always runs, whatever
//! happened afterwards. Shutdown problems are logged and never affect the
//! overall verdict.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{SuiteResult, TestSuite};
use crate::request_executor::DEFAULT_REQUEST_TIMEOUT;
use crate::runner::ScenarioRunner;
use crate::service::{ScriptOutcome, ServiceManager, ServiceScripts, ServiceTimeouts};

// ============================================================================
// Types
// ============================================================================

/// States visited by one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorPhase {
    Validating,
    Building,
    Starting,
    WaitingReady,
    Testing,
    ShuttingDown,
    Done,
}

impl std::fmt::Display for ExecutorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorPhase::Validating => write!(f, "validating"),
            ExecutorPhase::Building => write!(f, "building"),
            ExecutorPhase::Starting => write!(f, "starting"),
            ExecutorPhase::WaitingReady => write!(f, "waiting_ready"),
            ExecutorPhase::Testing => write!(f, "testing"),
            ExecutorPhase::ShuttingDown => write!(f, "shutting_down"),
            ExecutorPhase::Done => write!(f, "done"),
        }
    }
}

/// Settings for a `TestExecutor`.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Test-case file run in `Testing`.
    pub test_cases: PathBuf,
    /// Overrides the suite's `base_url` when set.
    pub base_url: Option<String>,
    pub timeouts: ServiceTimeouts,
    pub request_timeout: Duration,
}

impl ExecutorConfig {
    pub fn new(test_cases: impl Into<PathBuf>) -> Self {
        Self {
            test_cases: test_cases.into(),
            base_url: None,
            timeouts: ServiceTimeouts::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: ServiceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Outcome of one full verification cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionResult {
    pub success: bool,
    pub build_ok: bool,
    pub service_ok: bool,
    pub tests_ok: bool,
    pub build_errors: Vec<String>,
    pub service_errors: Vec<String>,
    pub test_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_result: Option<SuiteResult>,
    /// Wall-clock seconds.
    pub elapsed: f64,
    pub phases: Vec<ExecutorPhase>,
}

impl TestExecutionResult {
    fn new() -> Self {
        Self {
            success: false,
            build_ok: false,
            service_ok: false,
            tests_ok: false,
            build_errors: Vec::new(),
            service_errors: Vec::new(),
            test_errors: Vec::new(),
            suite_result: None,
            elapsed: 0.0,
            phases: Vec::new(),
        }
    }

    fn enter(&mut self, phase: ExecutorPhase) {
        tracing::debug!(phase = %phase, "entering phase");
        self.phases.push(phase);
    }
}

/// Verifies a translated project.
#[async_trait]
pub trait ProjectVerifier: Send + Sync {
    async fn verify(&self, project_dir: &Path) -> TestExecutionResult;
}

// ============================================================================
// Executor
// ============================================================================

pub struct TestExecutor {
    config: ExecutorConfig,
}

impl TestExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the whole cycle against `project_dir`.
    pub async fn execute(&self, project_dir: &Path) -> TestExecutionResult {
        let started = Instant::now();
        let mut result = TestExecutionResult::new();
        self.run_phases(project_dir, &mut result).await;
        result.success = result.build_ok && result.service_ok && result.tests_ok;
        result.elapsed = started.elapsed().as_secs_f64();
        result.enter(ExecutorPhase::Done);

        tracing::info!(
            success = result.success,
            build_ok = result.build_ok,
            service_ok = result.service_ok,
            tests_ok = result.tests_ok,
            elapsed = result.elapsed,
            "verification finished"
        );
        result
    }

    async fn run_phases(&self, project_dir: &Path, result: &mut TestExecutionResult) {
        // Validating
        result.enter(ExecutorPhase::Validating);
        let (scripts, suite) = match self.validate(project_dir) {
            Ok(setup) => setup,
            Err(errors) => {
                result.build_errors = errors;
                return;
            }
        };
        let service = ServiceManager::new(scripts, &suite.base_url, self.config.timeouts);

        // Building
        let start_budget = if service.scripts().build.is_some() {
            result.enter(ExecutorPhase::Building);
            if let Some(outcome) = service.build().await {
                if let Err(error) = build_error(&outcome) {
                    result.build_errors.push(error);
                    result.test_errors.push(CANNOT_RUN_TESTS.to_string());
                    return;
                }
            }
            self.config.timeouts.startup
        } else {
            self.config.timeouts.build
        };
        result.build_ok = true;

        // Starting, guarded by ShuttingDown
        result.enter(ExecutorPhase::Starting);
        self.start_and_test(&service, start_budget, &suite, result).await;

        result.enter(ExecutorPhase::ShuttingDown);
        service.stop().await;
    }

    async fn start_and_test(
        &self,
        service: &ServiceManager,
        start_budget: Duration,
        suite: &TestSuite,
        result: &mut TestExecutionResult,
    ) {
        let outcome = service.start(start_budget).await;
        if let Err(error) = start_error(&outcome) {
            result.service_errors.push(error);
            result.test_errors.push(CANNOT_RUN_TESTS.to_string());
            return;
        }

        result.enter(ExecutorPhase::WaitingReady);
        if !service.wait_until_ready().await {
            result
                .service_errors
                .push("Service failed to become ready within timeout".to_string());
            result.test_errors.push(CANNOT_RUN_TESTS.to_string());
            return;
        }
        result.service_ok = true;

        result.enter(ExecutorPhase::Testing);
        let mut runner = match ScenarioRunner::new(&suite.base_url, self.config.request_timeout) {
            Ok(runner) => runner,
            Err(e) => {
                result.test_errors.push(format!("Test execution failed: {}", e));
                return;
            }
        };
        let suite_result = runner.run_suite(suite).await;
        result.tests_ok = suite_result.success;
        if let Some(error) = &suite_result.error {
            result.test_errors.push(error.clone());
        }
        for scenario in suite_result.failed_scenarios() {
            result.test_errors.push(format!(
                "Scenario '{}' failed: {}/{} steps passed",
                scenario.scenario_name, scenario.passed_steps, scenario.total_steps
            ));
        }
        result.suite_result = Some(suite_result);
    }

    fn validate(&self, project_dir: &Path) -> Result<(ServiceScripts, TestSuite), Vec<String>> {
        let mut errors = Vec::new();

        let scripts = ServiceScripts::locate(project_dir)
            .map_err(|e| errors.push(e.to_string()))
            .ok();
        let suite = TestSuite::load(&self.config.test_cases)
            .and_then(|suite| match &self.config.base_url {
                Some(url) => suite.with_base_url(url),
                None => Ok(suite),
            })
            .map_err(|e| errors.push(e.to_string()))
            .ok();

        match (scripts, suite) {
            (Some(scripts), Some(suite)) => Ok((scripts, suite)),
            _ => {
                for error in &errors {
                    tracing::error!(error = %error, "verification setup invalid");
                }
                Err(errors)
            }
        }
    }
}

#[async_trait]
impl ProjectVerifier for TestExecutor {
    async fn verify(&self, project_dir: &Path) -> TestExecutionResult {
        self.execute(project_dir).await
    }
}

const CANNOT_RUN_TESTS: &str = "Cannot run tests - service failed to start";

fn build_error(outcome: &ScriptOutcome) -> Result<(), String> {
    script_error(outcome, "Build failed", "Build timed out")
}

fn start_error(outcome: &ScriptOutcome) -> Result<(), String> {
    script_error(outcome, "Service start failed", "Service start timed out")
}

fn script_error(outcome: &ScriptOutcome, failed: &str, timed_out: &str) -> Result<(), String> {
    let error = match outcome {
        ScriptOutcome::Completed { code: Some(0), .. } => return Ok(()),
        ScriptOutcome::Completed { code, stderr, .. } => {
            let code = code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string());
            if stderr.trim().is_empty() {
                format!("{} with return code {}", failed, code)
            } else {
                format!("{} with return code {}: {}", failed, code, stderr.trim())
            }
        }
        ScriptOutcome::TimedOut { secs } => format!("{} after {} seconds", timed_out, secs),
        ScriptOutcome::SpawnFailed(e) => format!("{} with exception: {}", failed, e),
    };
    tracing::error!(error = %error, "script failed");
    Err(error)
}
