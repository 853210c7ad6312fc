//! Bounded-concurrency scheduler
//!
//! Fans tasks out to the classifier with a counting admission gate: a task
//! starts as soon as one of the `concurrency` slots frees up, so one slow
//! store never holds back the tasks queued behind it.

use crate::input::Task;
use crate::probe::classifier::{Classifier, ProbeResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// A task paired with its classification
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub task: Task,
    pub result: ProbeResult,
}

/// Drives classification across many tasks
pub struct Scheduler {
    classifier: Arc<Classifier>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl Scheduler {
    /// Creates a scheduler admitting at most `concurrency` classifications at once
    ///
    /// A limit of zero is raised to one.
    pub fn new(classifier: Arc<Classifier>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            classifier,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Classifies every task and returns one record per task, in input order
    ///
    /// The run always drains: failures are already absorbed by the
    /// classifier, and a task that panics yields an all-false record.
    pub async fn run(&self, tasks: Vec<Task>) -> Vec<Record> {
        let total = tasks.len();
        tracing::info!(
            "Classifying {} stores with concurrency {}",
            total,
            self.concurrency
        );

        let mut in_flight: Vec<(Task, JoinHandle<ProbeResult>)> = Vec::with_capacity(total);

        for task in tasks {
            // The semaphore is never closed, so acquisition only fails if
            // that invariant breaks; fall back to running unpermitted
            let permit = self.semaphore.clone().acquire_owned().await.ok();

            let classifier = Arc::clone(&self.classifier);
            let url = task.url.clone();

            let handle = tokio::spawn(async move {
                // Permit is released when this block exits
                let _permit = permit;
                classifier.classify(&url).await
            });

            in_flight.push((task, handle));
        }

        let mut records = Vec::with_capacity(total);
        for (task, handle) in in_flight {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("Classification task for {} failed: {}", task.url, e);
                    ProbeResult::default()
                }
            };

            tracing::debug!(
                "Classified {} ({}): shopify={} active={} password={}",
                task.id,
                task.url,
                result.is_shopify,
                result.is_active,
                result.is_password_protected
            );
            records.push(Record { task, result });
        }

        tracing::info!("Classified {} of {} stores", records.len(), total);
        records
    }
}
