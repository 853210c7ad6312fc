//! Run context shared by the scheduler, classifier and transport
//!
//! Everything a run needs beyond its inputs travels in a [`RunContext`]:
//! the concurrency limit, the retry policy and the diagnostics sink. There is
//! no process-wide state. Runs count events with [`CountingDiagnostics`];
//! tests swap in a [`CollectingDiagnostics`] sink to inspect every event.

use crate::config::ProbeConfig;
use crate::probe::retry::RetryPolicy;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Classifier stage names, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Platform,
    Liveness,
    PasswordGate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Platform => "platform",
            Self::Liveness => "liveness",
            Self::PasswordGate => "password-gate",
        };
        f.write_str(name)
    }
}

/// A diagnostic event raised during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A request failed and will be attempted again after `delay`
    Retry {
        url: String,
        attempt: u32,
        delay: Duration,
        error: String,
    },

    /// A stage resolved to its conservative default because of a failure
    StageDegraded {
        url: String,
        stage: Stage,
        reason: String,
    },
}

/// Sink for diagnostic events
///
/// `record` must not block; it is called from inside in-flight requests.
pub trait Diagnostics: Send + Sync {
    fn record(&self, event: Diagnostic);
}

/// Emits every diagnostic as a tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: Diagnostic) {
        match event {
            Diagnostic::Retry {
                url,
                attempt,
                delay,
                error,
            } => {
                tracing::warn!(
                    url = %url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "request failed, retrying"
                );
            }
            Diagnostic::StageDegraded { url, stage, reason } => {
                tracing::debug!(url = %url, stage = %stage, reason = %reason, "stage degraded");
            }
        }
    }
}

/// Counts diagnostics and forwards them to tracing
///
/// Memory stays constant however many stores a run covers.
#[derive(Debug, Default)]
pub struct CountingDiagnostics {
    retries: AtomicUsize,
    degraded: AtomicUsize,
}

impl CountingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_count(&self) -> usize {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn degraded_count(&self) -> usize {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl Diagnostics for CountingDiagnostics {
    fn record(&self, event: Diagnostic) {
        let counter = match &event {
            Diagnostic::Retry { .. } => &self.retries,
            Diagnostic::StageDegraded { .. } => &self.degraded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        TracingDiagnostics.record(event);
    }
}

/// Keeps diagnostics in memory and forwards them to tracing
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn retry_count(&self) -> usize {
        self.count(|e| matches!(e, Diagnostic::Retry { .. }))
    }

    pub fn degraded_count(&self) -> usize {
        self.count(|e| matches!(e, Diagnostic::StageDegraded { .. }))
    }

    fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| predicate(e)).count())
            .unwrap_or(0)
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn record(&self, event: Diagnostic) {
        TracingDiagnostics.record(event.clone());
        // A poisoned lock only loses the in-memory copy
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Parameters and sinks for one run
#[derive(Clone)]
pub struct RunContext {
    /// Maximum number of classifications in flight
    pub concurrency: usize,
    /// Retry policy applied by the transport wrapper
    pub retry: RetryPolicy,
    /// Where diagnostics go
    pub diagnostics: Arc<dyn Diagnostics>,
}

impl RunContext {
    pub fn new(concurrency: usize, retry: RetryPolicy, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            concurrency: concurrency.max(1),
            retry,
            diagnostics,
        }
    }

    /// Context from configuration, logging diagnostics through tracing
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.concurrency as usize,
            RetryPolicy::from_config(config),
            Arc::new(TracingDiagnostics),
        )
    }

    /// Replaces the diagnostics sink
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
