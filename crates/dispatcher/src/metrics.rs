//! Worker metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one retry worker
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Items leased from the queue
    claimed: AtomicU64,
    /// Dispatches that returned 2xx
    dispatched: AtomicU64,
    /// Dispatches that returned a non-ok result
    failed: AtomicU64,
    /// Items dropped as terminal (missing endpoint, undecodable)
    dropped: AtomicU64,
    /// Items left for redelivery after an unexpected error
    errors: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Relaxed)
    }

    pub fn inc_claimed(&self) {
        self.claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            claimed: self.claimed(),
            dispatched: self.dispatched(),
            failed: self.failed(),
            dropped: self.dropped(),
            errors: self.errors(),
        }
    }
}

/// Snapshot of worker metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub claimed: u64,
    pub dispatched: u64,
    pub failed: u64,
    pub dropped: u64,
    pub errors: u64,
}
