//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a run.

use crate::output::{OutputResult, RunReport};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of the run to `output_path`
///
/// # Arguments
///
/// * `report` - The aggregated run report
/// * `config_hash` - Hash of the configuration file, if known
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    report: &RunReport,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_summary(report: &RunReport, config_hash: Option<&str>) -> String {
    let metrics = &report.metrics;
    let mut md = String::new();

    md.push_str("# Storefront Probe Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        metrics.started_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        metrics.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
        metrics.elapsed_seconds,
        metrics.elapsed_seconds / 60.0
    ));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Store Breakdown\n\n");
    md.push_str("| Metric | Count | Share |\n");
    md.push_str("|--------|-------|-------|\n");
    md.push_str(&format!(
        "| Total stores | {} | 100.00% |\n",
        metrics.total_stores
    ));
    md.push_str(&format!(
        "| Shopify | {} | {:.2}% |\n",
        metrics.shopify_stores, metrics.shopify_percentage
    ));
    md.push_str(&format!(
        "| Active | {} | {:.2}% |\n",
        metrics.active_stores, metrics.active_percentage
    ));
    md.push_str(&format!(
        "| Inactive | {} | {:.2}% |\n",
        metrics.inactive_stores, metrics.inactive_percentage
    ));
    md.push_str(&format!(
        "| Password protected | {} | {:.2}% |\n\n",
        metrics.password_protected_stores, metrics.password_protected_percentage
    ));

    md.push_str(&format!(
        "Shopify stores that failed the liveness check: {}\n\n",
        metrics.shopify_inactive_stores
    ));

    if !report.unprocessed_rows.is_empty() {
        md.push_str("## Unprocessed Rows\n\n");
        md.push_str(&format!(
            "{} rows had no identifier or URL and were copied to the report unclassified.\n",
            report.unprocessed_rows.len()
        ));
    }

    md
}
