//! RetryWorker - drains the durable retry queue
//!
//! Items are acknowledged only once `process_item` returns `Ok`, i.e. after
//! the event-log row for the attempt exists or the item was dropped as
//! terminal. Anything else is redelivered after the visibility timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{DispatchResult, QueueItem, RetryQueue};
use observability::{DispatchAggregator, DispatchSummary};
use tracing::{debug, error, info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, WorkerMetrics};

/// How one item ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Posted; the result may or may not be ok
    Dispatched(DispatchResult),
    /// Terminal, not retried
    Dropped,
}

/// Result of one drain run
#[derive(Debug, Clone)]
pub struct DrainReport {
    pub metrics: MetricsSnapshot,
    pub summary: DispatchSummary,
    /// Items still stored after the run (including leased ones)
    pub remaining: usize,
    pub elapsed: Duration,
}

pub struct RetryWorker {
    dispatcher: Arc<Dispatcher>,
    queue: Arc<dyn RetryQueue>,
    visibility: Duration,
    metrics: Arc<WorkerMetrics>,
}

impl RetryWorker {
    pub fn new(dispatcher: Arc<Dispatcher>, queue: Arc<dyn RetryQueue>, visibility: Duration) -> Self {
        Self {
            dispatcher,
            queue,
            visibility,
            metrics: Arc::new(WorkerMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Dispatch one queued item
    ///
    /// A missing endpoint is logged and dropped. A failed dispatch is a
    /// warning, not an error. Errors are unexpected faults (event log write)
    /// and leave redelivery to the queue.
    #[instrument(
        name = "worker_process_item",
        skip_all,
        fields(frontend = %item.meta.frontend, domain = %item.meta.domain, scope = %item.meta.scope)
    )]
    pub async fn process_item(&self, item: QueueItem) -> Result<ItemOutcome, DispatcherError> {
        let endpoint = item.endpoint.trim();
        if endpoint.is_empty() {
            error!(action = %item.meta.action, "Queue item missing endpoint, dropped");
            self.metrics.inc_dropped();
            observability::record_queue_item("dropped");
            return Ok(ItemOutcome::Dropped);
        }

        match self
            .dispatcher
            .post(endpoint, &item.secret, &item.payload, item.meta.clone())
            .await
        {
            Ok(result) => {
                if result.ok {
                    self.metrics.inc_dispatched();
                    observability::record_queue_item("dispatched");
                } else {
                    self.metrics.inc_failed();
                    observability::record_queue_item("failed");
                    warn!(
                        endpoint = %endpoint,
                        error = %result.failure_reason(),
                        "Queue revalidation failed"
                    );
                }
                Ok(ItemOutcome::Dispatched(result))
            }
            Err(e) => {
                self.metrics.inc_errors();
                observability::record_queue_item("error");
                error!(endpoint = %endpoint, error = %e, "Queue worker exception");
                Err(e)
            }
        }
    }

    /// Claim and process items until the queue is idle, `max_items` have been
    /// claimed, or `max_runtime` has elapsed
    #[instrument(name = "worker_run_until_idle", skip(self))]
    pub async fn run_until_idle(
        &self,
        max_items: Option<usize>,
        max_runtime: Duration,
    ) -> Result<DrainReport, DispatcherError> {
        let started = Instant::now();
        let mut aggregator = DispatchAggregator::new();
        let mut claimed: usize = 0;

        info!(queued = self.queue.len().map_err(DispatcherError::Queue)?, "Worker started");

        loop {
            if max_items.is_some_and(|max| claimed >= max) {
                debug!(claimed, "Item budget reached");
                break;
            }
            if started.elapsed() >= max_runtime {
                debug!(claimed, "Time budget reached");
                break;
            }

            let Some(leased) = self
                .queue
                .claim(self.visibility)
                .map_err(DispatcherError::Queue)?
            else {
                break;
            };
            claimed += 1;
            self.metrics.inc_claimed();

            let item = match leased.item() {
                Ok(item) => item,
                Err(e) => {
                    error!(id = leased.id, error = %e, "Undecodable queue item, dropped");
                    self.metrics.inc_dropped();
                    observability::record_queue_item("dropped");
                    self.ack(leased.id);
                    continue;
                }
            };
            let meta = item.meta.clone();

            match self.process_item(item).await {
                Ok(outcome) => {
                    if let ItemOutcome::Dispatched(result) = &outcome {
                        aggregator.update(&meta.normalized(), result);
                    }
                    self.ack(leased.id);
                }
                Err(_) => {
                    debug!(
                        id = leased.id,
                        attempts = leased.attempts,
                        "Item left for redelivery"
                    );
                }
            }
        }

        let report = DrainReport {
            metrics: self.metrics.snapshot(),
            summary: aggregator.summary(),
            remaining: self.queue.len().map_err(DispatcherError::Queue)?,
            elapsed: started.elapsed(),
        };
        info!(
            claimed = report.metrics.claimed,
            dispatched = report.metrics.dispatched,
            failed = report.metrics.failed,
            dropped = report.metrics.dropped,
            errors = report.metrics.errors,
            remaining = report.remaining,
            "Worker finished"
        );
        Ok(report)
    }

    fn ack(&self, id: i64) {
        // an unacked item is redelivered; duplicates are acceptable
        if let Err(e) = self.queue.ack(id) {
            warn!(id, error = %e, "Failed to acknowledge queue item");
        }
    }
}
