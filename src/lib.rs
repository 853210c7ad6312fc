//! Storefront-Probe: a batch storefront classifier
//!
//! This crate probes a list of store URLs over HTTP and decides, for each one,
//! whether it is hosted on Shopify, whether it is currently reachable, and
//! whether it sits behind a password gate. Results are merged back into the
//! original rows and summarised as run metrics.

pub mod config;
pub mod input;
pub mod output;
pub mod probe;

use chrono::Utc;
use std::path::Path;
use thiserror::Error;

/// Main error type for Storefront-Probe operations
///
/// Classification itself never fails; these errors cover the surrounding
/// plumbing of [`run`]: configuration, input rows, report files and HTTP
/// client construction.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Input row errors
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse input JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input must be a JSON array of objects, found {0}")]
    Shape(String),
}

/// Result type alias for Storefront-Probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

// Re-export commonly used types
pub use config::Config;
pub use input::{build_tasks, FieldMapping, Row, Task, TaskBatch};
pub use output::{aggregate, RunMetrics, RunReport};
pub use probe::{Classifier, ProbeResult, Record, RunContext, Scheduler};

/// Runs a whole batch as configured
///
/// Validates `config`, reads the input rows, classifies every row that has
/// an identifier and a URL, then writes the JSON report and the markdown
/// summary to the configured paths.
///
/// # Arguments
///
/// * `config` - Full configuration, validated again here
/// * `ctx` - Concurrency, retry policy and diagnostics sink for this run
/// * `config_hash` - Hash shown in the summary, if known
///
/// # Returns
///
/// * `Ok(RunReport)` - The report that was written
/// * `Err(ProbeError)` - Invalid config, unreadable input, HTTP client
///   construction failure, or a report file that could not be written
pub async fn run(
    config: &Config,
    ctx: &RunContext,
    config_hash: Option<&str>,
) -> Result<RunReport> {
    config::validate(config)?;

    let rows = input::load_rows(Path::new(&config.input.path))?;
    let batch = build_tasks(rows, &config.fields);
    tracing::info!(
        "Probing {} stores ({} rows unprocessed)",
        batch.tasks.len(),
        batch.invalid_rows.len()
    );

    let started_at = Utc::now();
    let records = probe::probe_all(config, ctx, batch.tasks).await?;
    let report =
        aggregate(&records, started_at, Utc::now()).with_unprocessed_rows(batch.invalid_rows);

    let report_path = Path::new(&config.output.report_path);
    output::write_json_report(&report, report_path)?;
    tracing::info!("Report written to: {}", report_path.display());

    let summary_path = Path::new(&config.output.summary_path);
    output::generate_markdown_summary(&report, config_hash, summary_path)?;
    tracing::info!("Summary written to: {}", summary_path.display());

    Ok(report)
}
