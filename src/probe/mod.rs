//! Probe module: everything between a store URL and its classification
//!
//! This module contains:
//! - The HTTP transport and its retry wrapper
//! - HTML inspection
//! - The three-stage classifier
//! - The bounded-concurrency scheduler
//! - The run context threaded through all of the above

mod classifier;
mod context;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use classifier::{Classification, Classifier, ProbeResult, StageOutcome};
pub use context::{
    CollectingDiagnostics, CountingDiagnostics, Diagnostic, Diagnostics, RunContext, Stage,
    TracingDiagnostics,
};
pub use fetcher::{
    build_http_client, normalize_scheme, user_agent_string, AcceptStatus, FetchError,
    FetchOptions, HttpResponse, RedirectMode, ReqwestTransport, Transport,
};
pub use parser::{AttrMatch, AttributeQuery, ElementQuery, HtmlInspector, ScraperInspector};
pub use retry::{RetryPolicy, RetryingTransport, DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS};
pub use scheduler::{Record, Scheduler};

use crate::config::Config;
use std::sync::Arc;

/// Classifies every task with a reqwest-backed transport configured from `config`
///
/// # Arguments
///
/// * `config` - Probe, user agent and platform settings
/// * `ctx` - Concurrency, retry policy and diagnostics sink for this run
/// * `tasks` - The stores to classify
///
/// # Returns
///
/// * `Ok(Vec<Record>)` - One record per task, in input order
/// * `Err(ProbeError)` - The HTTP client could not be built
pub async fn probe_all(
    config: &Config,
    ctx: &RunContext,
    tasks: Vec<crate::input::Task>,
) -> crate::Result<Vec<Record>> {
    let transport = ReqwestTransport::new(&config.probe, &config.user_agent)?;
    let classifier = Classifier::for_run(transport, ctx, config.platform.clone());
    let scheduler = Scheduler::new(Arc::new(classifier), ctx.concurrency);
    Ok(scheduler.run(tasks).await)
}
