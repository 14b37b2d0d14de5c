mod cli;

use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use strand_cli::plan::TaskPlan;
use strand_cli::search::{find_matches, replace_all};
use strand_core::config::load_dotenv;
use strand_core::Config;
use strand_pattern::CompiledPattern;
use strand_scheduler::SchedulerContext;

use crate::cli::{CliArgs, Command, PatternArgs};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => Config::from_env(),
    };
    if let Some(workers) = args.workers {
        config.scheduler.worker_threads = workers;
    }
    config.validate().context("invalid configuration")?;
    config.log_summary();

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config.summary())?);
        return Ok(());
    }

    match args.command {
        Some(Command::Plan { file, max_concurrent }) => {
            SchedulerContext::init(config.scheduler.clone())
                .context("failed to start scheduler")?;
            let mut plan = TaskPlan::load(&file)?;
            if max_concurrent.is_some() {
                plan.max_concurrent = max_concurrent;
            }
            let report = plan.run().context("plan failed")?;
            info!(tasks = report.tasks.len(), "plan finished");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Command::Matches { pattern }) => {
            let compiled = compile(&pattern, &config)?;
            let subject = read_subject(&pattern)?;
            let reports = find_matches(&compiled, &subject, pattern.matching_options())?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Some(Command::Replace { pattern, template }) => {
            let compiled = compile(&pattern, &config)?;
            let subject = read_subject(&pattern)?;
            let replaced = replace_all(&compiled, &subject, pattern.matching_options(), &template)?;
            println!("{replaced}");
        }
        None => bail!("no command given (see --help)"),
    }

    Ok(())
}

fn compile(args: &PatternArgs, config: &Config) -> Result<CompiledPattern> {
    CompiledPattern::builder(&args.pattern)
        .options(args.pattern_options())
        .config(&config.pattern)
        .build()
        .context("failed to compile pattern")
}

fn read_subject(args: &PatternArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()));
    }
    let mut subject = String::new();
    std::io::stdin()
        .read_to_string(&mut subject)
        .context("failed to read subject from stdin")?;
    Ok(subject)
}
