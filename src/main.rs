//! prscribe — LLM-drafted pull request descriptions.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use prscribe::bitbucket;
use prscribe::config;
use prscribe::constants;
use prscribe::diff;
use prscribe::env;
use prscribe::models;
use prscribe::optimizer;
use prscribe::orchestrator;
use prscribe::output;
use prscribe::progress;
use prscribe::providers;

use std::io::IsTerminal;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::args::{Cli, Command, DraftArgs, InputArgs, InputMode, OutputFormat, PlanArgs};
use config::Config;
use env::Env;
use models::PromptData;
use orchestrator::DescriptionOrchestrator;
use progress::ProgressTracker;
use providers::DescriptionProvider;
use providers::rig::RigProvider;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

/// Install the stderr log subscriber.
///
/// `PRSCRIBE_LOG` wins over `RUST_LOG`; without either, only warnings are
/// shown unless `--verbose` is set.
fn init_logging(verbose: bool) {
    let default = if verbose { "prscribe=debug" } else { "prscribe=warn" };
    let filter = EnvFilter::try_from_env(constants::ENV_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Draft(args) => run_draft(*args).await,
        Command::Plan(args) => run_plan(args).await,
        Command::Version => run_version(),
    }
}

/// Print version information.
fn run_version() -> Result<()> {
    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        constants::VERSION.green().bold()
    );
    Ok(())
}

/// Load layered config from the `--path` directory.
fn load_config(input: &InputArgs, env: &Env) -> Result<Config> {
    let work_dir = std::fs::canonicalize(&input.path)
        .with_context(|| format!("--path directory not found: {}", input.path.display()))?;
    Config::load(Some(&work_dir), env).context("failed to load configuration")
}

/// Read the diff (and, for Bitbucket, the PR metadata) from the selected source.
async fn load_prompt_data(input: &InputArgs, env: &Env) -> Result<PromptData> {
    let mode = input.validate_input().map_err(|e| anyhow::anyhow!("{e}"))?;

    match mode {
        InputMode::DiffFile(path) => {
            let diff = diff::file::read_diff_file(&path)
                .await
                .context("failed to read diff")?;
            Ok(PromptData {
                diff,
                ..PromptData::default()
            })
        }
        InputMode::Stdin => {
            let diff = diff::read_diff_stdin()
                .await
                .context("failed to read diff from stdin")?;
            Ok(PromptData {
                diff,
                ..PromptData::default()
            })
        }
        InputMode::Bitbucket(reference) => {
            let pr: bitbucket::PullRequestRef = reference.parse()?;
            let token = env.var(constants::ENV_BITBUCKET_TOKEN).ok();
            let client = bitbucket::BitbucketClient::new(token)?;
            client
                .fetch_prompt(&pr)
                .await
                .with_context(|| format!("failed to fetch pull request {pr}"))
        }
    }
}

/// Draft a description and print it.
async fn run_draft(args: DraftArgs) -> Result<()> {
    let env = Env::real();

    let mut config = load_config(&args.input, &env)?;
    args.pipeline
        .apply(&mut config)
        .context("invalid chunking options")?;
    args.apply_provider(&mut config);
    if config.provider.api_key.is_none() {
        config.provider.api_key = config
            .provider
            .name
            .api_key_env_var()
            .and_then(|var| env.var(var).ok());
    }

    let mut data = load_prompt_data(&args.input, &env).await?;
    args.metadata.apply(&mut data);

    if data.diff.trim().is_empty() {
        eprintln!("No changes to describe.");
        return Ok(());
    }

    let provider: Arc<dyn DescriptionProvider> = Arc::new(
        RigProvider::new(config.provider.clone()).map_err(|e| anyhow::anyhow!("{e}"))?,
    );
    let orchestrator = DescriptionOrchestrator::from_config(&config, provider)
        .context("failed to set up the pipeline")?;

    // Progress only makes sense on an interactive terminal.
    let show_progress = !args.no_progress
        && !args.quiet
        && args.format == OutputFormat::Terminal
        && std::io::stderr().is_terminal();

    let tracker = Arc::new(ProgressTracker::new(show_progress));
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let display = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.run(rx).await })
    };

    let drafting = orchestrator.describe(&data, Some(tx));
    let outcome = match args.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), drafting)
            .await
            .map_err(|_| anyhow::anyhow!("drafting timed out after {secs}s"))
            .and_then(|r| r.map_err(anyhow::Error::from)),
        None => drafting.await.map_err(anyhow::Error::from),
    };

    // The sender is gone once drafting ends, so the display task finishes.
    let _ = display.await;
    tracker.finish();

    let report = outcome.context("drafting failed")?;
    print!("{}", args.format.render(&report));

    if !report.result.success {
        bail!(
            "could not draft a description: {}",
            report.result.error.as_deref().unwrap_or("unknown error")
        );
    }

    if report.result.failed_chunks > 0 && !args.quiet {
        eprintln!(
            "\n  {} {}",
            "⚠".yellow().bold(),
            format!(
                "{} of {} chunk(s) failed; the description may be incomplete.",
                report.result.failed_chunks, report.result.chunks_processed
            )
            .yellow()
        );
    }

    Ok(())
}

/// Show how the diff would be filtered and chunked.
async fn run_plan(args: PlanArgs) -> Result<()> {
    let env = Env::real();

    let mut config = load_config(&args.input, &env)?;
    args.pipeline
        .apply(&mut config)
        .context("invalid chunking options")?;

    let data = load_prompt_data(&args.input, &env).await?;
    let optimizer = optimizer::PromptOptimizer::from_config(&config)
        .context("failed to set up the pipeline")?;
    let report = output::plan::PlanReport::from_prepared(&optimizer.optimize(&data));

    if args.json {
        println!("{}", report.to_json());
    } else {
        print!("{}", report.render_terminal());
    }
    Ok(())
}
