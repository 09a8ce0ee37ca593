// harrier - replays recorded HTTP sessions against a live target
//
// A .har archive is replayed entry by entry, preserving the recorded
// inter-request rhythm (scaled by a velocity factor), while a chain of
// transforms rewrites the traffic on the fly: constants are substituted,
// and values harvested from live responses (session tokens, account ids)
// are fed into subsequent requests.
//
// Architecture:
// - har: the archive data model (parse, round-trip serialize)
// - transform: the self-rewriting transform chain
// - executor: the HTTP capability (reqwest reference implementation)
// - runner: per-archive dispatch loop with pacing and lifecycle control
// - registry: the process-wide set of live runners

mod cli;
mod config;
mod error;
mod executor;
mod har;
mod logging;
mod runner;
mod startup;
#[cfg(test)]
mod testutil;
mod transform;
mod util;

use anyhow::{bail, Result};
use clap::Parser;
use cli::Cli;
use config::Config;
use executor::HttpExecutor;
use har::Har;
use logging::LogSink;
use runner::{Registry, Runner};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Handle CLI commands first (config --show, --path, --reset)
    // If a command was handled, exit early
    if cli::handle_command(&args) {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    // Load configuration, then let CLI flags win
    let mut config = Config::from_env();
    if let Some(velocity) = args.velocity {
        config.velocity = velocity;
    }
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }

    // Initialize tracing
    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!("harrier={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(har_path) = args.har.as_deref() else {
        bail!("no archive given; usage: harrier <FILE.har> [--velocity V] [--workers N] [--transforms FILE]");
    };
    let archive = Arc::new(Har::from_file(har_path)?);

    // Transform chain description, if any. Patterns are validated when the
    // per-worker chains are built below, before any replay starts.
    let transform_configs = match &args.transforms {
        Some(path) => transform::load_transforms(path)?,
        None => Vec::new(),
    };

    startup::print_startup(&config, &archive, transform_configs.len());
    startup::log_startup(&config, &archive, transform_configs.len());

    let registry = Registry::new();
    let executor = Arc::new(HttpExecutor::new(LogSink::stderr("http"))?);

    // Each worker gets its own freshly built chain: transform state is
    // per-runner and must not be shared between workers.
    let mut runners = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        let chain = transform::build_chain(&transform_configs)?;
        let runner = Runner::new(
            archive.clone(),
            executor.clone(),
            chain,
            config.velocity,
            registry.clone(),
        )?;
        runner.run()?;
        runners.push(runner);
    }
    tracing::info!(workers = runners.len(), "replay started");

    // Wait for every runner to drain, or stop the fleet on Ctrl-C
    let replay = async {
        for runner in &runners {
            runner.done().await;
        }
    };
    tokio::select! {
        _ = replay => {
            tracing::info!("replay complete");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, stopping runners");
            registry.kill_all();
            for runner in &runners {
                runner.done().await;
            }
            tracing::info!("all runners stopped");
        }
    }

    Ok(())
}
