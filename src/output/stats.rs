//! Run metrics
//!
//! This module reduces classified records to the summary numbers shown in
//! the report and printed at the end of a run.

use crate::probe::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary metrics for one run
///
/// `inactive_stores` counts every row not confirmed active, so
/// `active_stores + inactive_stores == total_stores`. Platform stores that
/// failed the liveness check are counted separately in
/// `shopify_inactive_stores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub total_stores: u64,
    pub shopify_stores: u64,
    pub active_stores: u64,
    pub inactive_stores: u64,
    pub shopify_inactive_stores: u64,
    pub password_protected_stores: u64,

    /// Percentages of `total_stores`
    pub shopify_percentage: f64,
    pub active_percentage: f64,
    pub inactive_percentage: f64,
    pub password_protected_percentage: f64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
}

impl RunMetrics {
    /// Computes metrics over the given records
    pub fn compute(records: &[Record], started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        let total_stores = records.len() as u64;
        let count = |predicate: fn(&Record) -> bool| {
            records.iter().filter(|r| predicate(r)).count() as u64
        };

        let shopify_stores = count(|r| r.result.is_shopify);
        let active_stores = count(|r| r.result.is_active);
        let password_protected_stores = count(|r| r.result.is_password_protected);

        let elapsed_seconds = (finished_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            total_stores,
            shopify_stores,
            active_stores,
            inactive_stores: total_stores - active_stores,
            shopify_inactive_stores: shopify_stores.saturating_sub(active_stores),
            password_protected_stores,
            shopify_percentage: percentage(shopify_stores, total_stores),
            active_percentage: percentage(active_stores, total_stores),
            inactive_percentage: percentage(total_stores - active_stores, total_stores),
            password_protected_percentage: percentage(password_protected_stores, total_stores),
            started_at,
            finished_at,
            elapsed_seconds,
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Prints metrics to stdout in a formatted manner
pub fn print_metrics(metrics: &RunMetrics) {
    println!("=== Storefront Probe Results ===\n");

    println!("Stores:");
    println!("  Total: {}", metrics.total_stores);
    println!(
        "  Shopify: {} ({:.1}%)",
        metrics.shopify_stores, metrics.shopify_percentage
    );
    println!(
        "  Active: {} ({:.1}%)",
        metrics.active_stores, metrics.active_percentage
    );
    println!(
        "  Inactive: {} ({} Shopify stores unreachable)",
        metrics.inactive_stores, metrics.shopify_inactive_stores
    );
    println!(
        "  Password protected: {} ({:.1}%)",
        metrics.password_protected_stores, metrics.password_protected_percentage
    );
    println!();

    println!(
        "Elapsed: {:.1}s ({} -> {})",
        metrics.elapsed_seconds,
        metrics.started_at.to_rfc3339(),
        metrics.finished_at.to_rfc3339()
    );
}
