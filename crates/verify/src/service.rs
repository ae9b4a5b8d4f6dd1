//! Service Manager
//!
//! Locates the project's lifecycle scripts, runs them as bounded
//! subprocesses and polls the service's health endpoint.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use project_translator_core::{CoreError, CoreResult};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{sleep, timeout, Instant};

/// Per-request timeout of a single health probe.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period for collecting script output after the script exits.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Script discovery
// ============================================================================

/// Lifecycle scripts for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceScripts {
    pub start: PathBuf,
    pub shutdown: PathBuf,
    /// Optional separate build step, found beside `start.sh`.
    pub build: Option<PathBuf>,
}

impl ServiceScripts {
    /// Find `start.sh` and `shutdown.sh`, each in `project_dir` or else in
    /// its parent.
    ///
    /// Returned paths are absolute. Every script found must be executable.
    pub fn locate(project_dir: &Path) -> CoreResult<Self> {
        if !project_dir.is_dir() {
            return Err(CoreError::not_found(format!(
                "Test project directory not found: {}",
                project_dir.display()
            )));
        }
        let project_dir = project_dir.canonicalize()?;

        let start = find_script(&project_dir, "start.sh")?;
        let shutdown = find_script(&project_dir, "shutdown.sh")?;
        let build = start
            .parent()
            .map(|dir| dir.join("build.sh"))
            .filter(|p| p.is_file());

        for script in [Some(&start), Some(&shutdown), build.as_ref()].into_iter().flatten() {
            if !is_executable(script) {
                return Err(CoreError::validation(format!(
                    "Script is not executable: {}",
                    script.display()
                )));
            }
        }

        Ok(Self {
            start,
            shutdown,
            build,
        })
    }
}

fn find_script(project_dir: &Path, name: &str) -> CoreResult<PathBuf> {
    [Some(project_dir), project_dir.parent()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            CoreError::not_found(format!(
                "{} not found in {} or its parent",
                name,
                project_dir.display()
            ))
        })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ============================================================================
// Script execution
// ============================================================================

/// Result of running one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The script exited on its own.
    Completed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The script exceeded its budget and was killed.
    TimedOut { secs: u64 },
    /// The script could not be started at all.
    SpawnFailed(String),
}

impl ScriptOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ScriptOutcome::Completed { code: Some(0), .. })
    }
}

/// Run `script` with its own directory as cwd, bounded by `budget`.
///
/// Output pipes are drained concurrently so a chatty script cannot block on
/// a full pipe. A script that leaves a background process holding the pipes
/// open still returns once it exits.
pub async fn run_script(script: &Path, budget: Duration) -> ScriptOutcome {
    // A relative program path would be resolved against the new cwd.
    let script = &std::path::absolute(script).unwrap_or_else(|_| script.to_path_buf());
    let cwd = script.parent().unwrap_or_else(|| Path::new("."));
    tracing::info!(script = %script.display(), budget_secs = budget.as_secs(), "running script");

    let mut child = match Command::new(script)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(script = %script.display(), error = %e, "failed to spawn script");
            return ScriptOutcome::SpawnFailed(e.to_string());
        }
    };

    let stdout = child.stdout.take().map(|p| tokio::spawn(read_pipe(p)));
    let stderr = child.stderr.take().map(|p| tokio::spawn(read_pipe(p)));

    let status = match timeout(budget, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return ScriptOutcome::SpawnFailed(e.to_string()),
        Err(_) => {
            let _ = child.kill().await;
            tracing::warn!(script = %script.display(), "script timed out");
            return ScriptOutcome::TimedOut {
                secs: budget.as_secs(),
            };
        }
    };

    let stdout = collect(stdout).await;
    let stderr = collect(stderr).await;
    tracing::debug!(script = %script.display(), code = ?status.code(), "script finished");

    ScriptOutcome::Completed {
        code: status.code(),
        stdout,
        stderr,
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(mut pipe: R) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect(handle: Option<tokio::task::JoinHandle<String>>) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    let abort = handle.abort_handle();
    match timeout(PIPE_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            abort.abort();
            String::new()
        }
    }
}

// ============================================================================
// Health check
// ============================================================================

/// Poll `GET {base_url}/health` every `interval` until it answers 200 or
/// `budget` elapses.
pub async fn wait_until_ready(base_url: &str, budget: Duration, interval: Duration) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(HEALTH_PROBE_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build health-check client");
            return false;
        }
    };
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let deadline = Instant::now() + budget;

    loop {
        match client.get(&url).send().await {
            Ok(response) if response.status().as_u16() == 200 => {
                tracing::info!(url = %url, "service is ready");
                return true;
            }
            Ok(response) => {
                tracing::debug!(url = %url, status = response.status().as_u16(), "service not ready");
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "health probe failed");
            }
        }

        if Instant::now() + interval > deadline {
            tracing::warn!(url = %url, budget_secs = budget.as_secs(), "service did not become ready");
            return false;
        }
        sleep(interval).await;
    }
}

// ============================================================================
// Service Manager
// ============================================================================

/// Time budgets for the service lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeouts {
    pub build: Duration,
    pub startup: Duration,
    pub shutdown: Duration,
    pub health: Duration,
    pub check_interval: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            build: Duration::from_secs(300),
            startup: Duration::from_secs(120),
            shutdown: Duration::from_secs(30),
            health: Duration::from_secs(60),
            check_interval: Duration::from_secs(2),
        }
    }
}

/// Drives one project's service through build, start, readiness and stop.
#[derive(Debug, Clone)]
pub struct ServiceManager {
    scripts: ServiceScripts,
    base_url: String,
    timeouts: ServiceTimeouts,
}

impl ServiceManager {
    pub fn new(scripts: ServiceScripts, base_url: &str, timeouts: ServiceTimeouts) -> Self {
        Self {
            scripts,
            base_url: base_url.to_string(),
            timeouts,
        }
    }

    pub fn scripts(&self) -> &ServiceScripts {
        &self.scripts
    }

    pub fn timeouts(&self) -> &ServiceTimeouts {
        &self.timeouts
    }

    /// Run `build.sh`, if the project has one.
    pub async fn build(&self) -> Option<ScriptOutcome> {
        match &self.scripts.build {
            Some(script) => Some(run_script(script, self.timeouts.build).await),
            None => None,
        }
    }

    /// Run `start.sh` with `budget`.
    pub async fn start(&self, budget: Duration) -> ScriptOutcome {
        run_script(&self.scripts.start, budget).await
    }

    pub async fn wait_until_ready(&self) -> bool {
        wait_until_ready(
            &self.base_url,
            self.timeouts.health,
            self.timeouts.check_interval,
        )
        .await
    }

    /// Run `shutdown.sh`. Failures are only logged.
    pub async fn stop(&self) -> ScriptOutcome {
        let outcome = run_script(&self.scripts.shutdown, self.timeouts.shutdown).await;
        if !outcome.succeeded() {
            tracing::warn!(outcome = ?outcome, "shutdown script did not complete cleanly");
        }
        outcome
    }
}
