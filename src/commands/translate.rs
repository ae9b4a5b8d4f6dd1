//! Translate Commands
//!
//! `translate run` drives the retry loop; `translate analyze` prints what
//! the project analyzer sees in a source tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use project_translator_llm::{create_provider, LlmProvider};
use project_translator_tools::ProjectAnalyzer;
use project_translator_verify::{ExecutorConfig, ProjectVerifier, TestExecutor};
use tokio_util::sync::CancellationToken;

use crate::models::config::{TranslationMethod, TranslatorConfig};
use crate::services::translation::{
    BatchTranslator, ConversationLog, IterativeSettings, IterativeTranslator, RetryOrchestrator,
    RetryOutcome, SessionMetadata, TranslationEngine, TranslationJob,
};
use crate::storage::ConfigService;

#[derive(Subcommand, Debug)]
pub enum TranslateCommand {
    /// Translate, verify and retry with feedback.
    Run(RunArgs),

    /// Summarize a source project.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source project directory.
    #[arg(long)]
    pub source: PathBuf,

    /// Output directory for the translated project.
    #[arg(long)]
    pub output: PathBuf,

    /// Source language.
    #[arg(long)]
    pub from_lang: String,

    /// Target language.
    #[arg(long)]
    pub to_lang: String,

    /// Translation engine (defaults to `translation.method`).
    #[arg(long, value_enum)]
    pub method: Option<TranslationMethod>,

    /// Test suite used to verify each attempt.
    #[arg(long)]
    pub test_cases: Option<PathBuf>,

    /// Retries after the first attempt (defaults to `translation.max_retries`).
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Iteration budget for the iterative engine.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Do not write a conversation log.
    #[arg(long)]
    pub no_save_conversation: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Source project directory.
    #[arg(long)]
    pub source: PathBuf,
}

pub async fn run(
    cmd: TranslateCommand,
    config_path: &Path,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    match cmd {
        TranslateCommand::Run(args) => {
            let mut config = ConfigService::load_or_init(config_path)?.into_config();
            apply_overrides(&mut config, &args);
            config.validate().map_err(anyhow::Error::msg)?;
            run_translation(&config, &args, cancel).await
        }
        TranslateCommand::Analyze(args) => {
            if !args.source.is_dir() {
                bail!("Source path is not a directory: {}", args.source.display());
            }
            let analysis = ProjectAnalyzer::new(&args.source).analyze();
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(true)
        }
    }
}

fn apply_overrides(config: &mut TranslatorConfig, args: &RunArgs) {
    let translation = &mut config.translation;
    if let Some(method) = args.method {
        translation.method = method;
    }
    if let Some(max_retries) = args.max_retries {
        translation.max_retries = max_retries;
    }
    if let Some(max_iterations) = args.max_iterations {
        translation.max_iterations = max_iterations;
    }
    if args.no_save_conversation {
        translation.save_conversation = false;
    }
}

/// Engine selected by `translation.method`.
pub fn build_engine(
    config: &TranslatorConfig,
    provider: Arc<dyn LlmProvider>,
) -> Arc<dyn TranslationEngine> {
    match config.translation.method {
        TranslationMethod::Batch => Arc::new(BatchTranslator::new(provider)),
        TranslationMethod::Iterative => {
            let settings = IterativeSettings {
                max_iterations: config.translation.max_iterations,
                iteration_delay: Duration::from_millis(config.translation.iteration_delay_ms),
                auto_save_interval: config.translation.auto_save_interval,
            };
            Arc::new(IterativeTranslator::new(provider, settings))
        }
    }
}

/// Test Executor for `test_cases`, configured from `config`.
pub fn build_verifier(config: &TranslatorConfig, test_cases: &Path) -> Arc<dyn ProjectVerifier> {
    let executor_config = ExecutorConfig::new(test_cases)
        .with_timeouts(config.service_timeouts())
        .with_request_timeout(config.request_timeout());
    Arc::new(TestExecutor::new(executor_config))
}

async fn run_translation(
    config: &TranslatorConfig,
    args: &RunArgs,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    if !args.source.is_dir() {
        bail!("Source path is not a directory: {}", args.source.display());
    }
    if let Some(test_cases) = &args.test_cases {
        if !test_cases.is_file() {
            bail!("Test cases file not found: {}", test_cases.display());
        }
    }
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create output directory {}", args.output.display()))?;

    let provider = create_provider(config.llm_provider.provider_config())?;
    let engine = build_engine(config, Arc::clone(&provider));
    let verifier = args
        .test_cases
        .as_deref()
        .map(|path| build_verifier(config, path));
    let max_retries = if config.translation.retry_on_error {
        config.translation.max_retries
    } else {
        0
    };

    let job = TranslationJob::new(&args.source, &args.output, &args.from_lang, &args.to_lang);
    let mut orchestrator =
        RetryOrchestrator::new(engine, verifier, max_retries).with_cancellation(cancel);

    if config.translation.save_conversation {
        let metadata = SessionMetadata::new(
            &config.translation.method.to_string(),
            &args.from_lang,
            &args.to_lang,
            &args.source,
            &args.output,
            provider.name(),
            provider.model(),
        );
        let log = ConversationLog::create(
            Path::new(&config.translation.conversation_dir),
            config.translation.conversation_file.as_deref(),
            metadata,
        )?;
        orchestrator = orchestrator.with_log(log);
    }

    tracing::info!(
        source = %args.source.display(),
        output = %args.output.display(),
        from = %args.from_lang,
        to = %args.to_lang,
        method = %config.translation.method,
        max_retries,
        "starting translation"
    );
    let outcome = orchestrator.run(&job).await;

    print_outcome(&outcome);
    if let Some(log) = orchestrator.log() {
        println!("Conversation log: {}", log.path().display());
    }
    Ok(outcome.success)
}

fn print_outcome(outcome: &RetryOutcome) {
    println!("{}", outcome.message);
    for attempt in &outcome.retry_attempts {
        let status = if attempt.success { "PASS" } else { "FAIL" };
        println!(
            "  Attempt {}: {} ({} error(s))",
            attempt.attempt, status, attempt.error_count
        );
        for error in &attempt.errors {
            println!("    - [{}] {}", error.kind, error.message);
        }
    }
    if let Some(stats) = &outcome.translation_stats {
        let usage = stats.usage();
        println!(
            "Files written: {} (tokens in/out: {}/{})",
            stats.files_written(),
            usage.input_tokens,
            usage.output_tokens
        );
    }
}
