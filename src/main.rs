//! Storefront-Probe main entry point
//!
//! This is the command-line interface for the Storefront-Probe classifier.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storefront_probe::config::{load_config_with_hash, validate, Config};
use storefront_probe::input::{build_tasks, load_rows, TaskBatch};
use storefront_probe::output::print_metrics;
use storefront_probe::probe::{CountingDiagnostics, RunContext};
use tracing_subscriber::EnvFilter;

/// Storefront-Probe: a batch storefront classifier
///
/// Reads store rows, checks each URL for a Shopify storefront, whether it is
/// active, and whether it is password protected, then writes a JSON report
/// and a markdown summary.
#[derive(Parser, Debug)]
#[command(name = "storefront-probe")]
#[command(version)]
#[command(about = "Classify store URLs by platform, liveness and password gate", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the configured concurrency limit
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Validate config and input, show what would be probed, and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(concurrency) = cli.concurrency {
        config.probe.concurrency = concurrency;
        validate(&config).context("invalid --concurrency")?;
    }

    if cli.dry_run {
        let input_path = Path::new(&config.input.path);
        let rows = load_rows(input_path)
            .with_context(|| format!("failed to read input rows from {}", input_path.display()))?;
        handle_dry_run(&config, &build_tasks(rows, &config.fields));
        return Ok(());
    }

    handle_probe(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("storefront_probe=info,warn"),
            1 => EnvFilter::new("storefront_probe=debug,info"),
            2 => EnvFilter::new("storefront_probe=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be probed
fn handle_dry_run(config: &Config, batch: &TaskBatch) {
    println!("=== Storefront-Probe Dry Run ===\n");

    println!("Probe Configuration:");
    println!("  Concurrency: {}", config.probe.concurrency);
    println!("  Timeout: {}ms", config.probe.timeout_ms);
    println!("  Attempts per request: {}", config.probe.max_attempts);
    println!("  Backoff unit: {}ms", config.probe.backoff_ms);
    println!("  Password gate redirect cap: {}", config.probe.max_redirects);

    println!("\nFields:");
    println!("  Identifier: {}", config.fields.id_field);
    println!("  URL: {}", config.fields.url_field);
    match &config.fields.passthrough {
        Some(fields) => println!("  Passthrough: {}", fields.join(", ")),
        None => println!("  Passthrough: all fields"),
    }

    println!("\nOutput:");
    println!("  Report: {}", config.output.report_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nRows:");
    println!("  Would probe: {}", batch.tasks.len());
    println!("  Unprocessed (missing identifier or URL): {}", batch.invalid_rows.len());
    for task in batch.tasks.iter().take(10) {
        println!("    * {} {}", task.id, task.url);
    }
    if batch.tasks.len() > 10 {
        println!("    ... and {} more", batch.tasks.len() - 10);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main probe run
async fn handle_probe(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let diagnostics = Arc::new(CountingDiagnostics::new());
    let ctx = RunContext::from_config(&config.probe).with_diagnostics(diagnostics.clone());

    let report = storefront_probe::run(&config, &ctx, Some(config_hash))
        .await
        .context("probe run failed")?;

    tracing::info!(
        "Run finished: {} retries, {} degraded stages",
        diagnostics.retry_count(),
        diagnostics.degraded_count()
    );

    print_metrics(&report.metrics);

    Ok(())
}
