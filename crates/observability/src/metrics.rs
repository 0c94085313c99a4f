//! Revalidation metrics
//!
//! Prometheus series for dispatches, failure counters, alerts and queue
//! items, and an in-memory aggregator for run summaries.

use std::collections::BTreeMap;

use contracts::{DispatchMeta, DispatchResult, FailureKey};
use metrics::{counter, gauge, histogram};

/// Record one dispatch attempt
pub fn record_dispatch(meta: &DispatchMeta, result: &DispatchResult) {
    let status = if result.ok {
        "success"
    } else if result.status == 0 {
        "transport_error"
    } else {
        "http_error"
    };
    counter!(
        "revalidator_dispatch_total",
        "frontend" => meta.frontend.clone(),
        "domain" => meta.domain.clone(),
        "action" => meta.action.as_str(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "revalidator_dispatch_latency_ms",
        "frontend" => meta.frontend.clone(),
        "domain" => meta.domain.clone()
    )
    .record(result.latency_ms as f64);
}

/// Current consecutive-failure count of a key
pub fn record_consecutive_failures(key: &FailureKey, count: i64) {
    gauge!(
        "revalidator_consecutive_failures",
        "frontend" => key.frontend.clone(),
        "domain" => key.domain.clone(),
        "scope" => key.scope.clone()
    )
    .set(count as f64);
}

/// Record an alert delivery attempt on one channel
pub fn record_alert(channel: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "revalidator_alerts_total",
        "channel" => channel.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record how a queue item ended (`dispatched`, `failed`, `dropped`, `error`)
pub fn record_queue_item(outcome: &'static str) {
    counter!("revalidator_queue_items_total", "outcome" => outcome).increment(1);
}

/// Aggregates dispatch results in memory for a summary report
#[derive(Debug, Clone, Default)]
pub struct DispatchAggregator {
    pub total: u64,
    pub succeeded: u64,
    /// Non-2xx responses
    pub http_errors: u64,
    /// No response received
    pub transport_errors: u64,
    pub latency_ms: RunningStats,
    /// Failed attempts per frontend
    pub failures_by_frontend: BTreeMap<String, u64>,
}

impl DispatchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, meta: &DispatchMeta, result: &DispatchResult) {
        self.total += 1;
        self.latency_ms.push(result.latency_ms as f64);
        if result.ok {
            self.succeeded += 1;
            return;
        }
        if result.status == 0 {
            self.transport_errors += 1;
        } else {
            self.http_errors += 1;
        }
        *self
            .failures_by_frontend
            .entry(meta.frontend.clone())
            .or_insert(0) += 1;
    }

    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            http_errors: self.http_errors,
            transport_errors: self.transport_errors,
            success_rate: if self.total > 0 {
                self.succeeded as f64 / self.total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_ms),
            failures_by_frontend: self.failures_by_frontend.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total: u64,
    pub succeeded: u64,
    pub http_errors: u64,
    pub transport_errors: u64,
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub failures_by_frontend: BTreeMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Dispatches: {}", self.total)?;
        writeln!(
            f,
            "Succeeded: {} ({:.1}%)",
            self.succeeded, self.success_rate
        )?;
        writeln!(f, "HTTP errors: {}", self.http_errors)?;
        writeln!(f, "Transport errors: {}", self.transport_errors)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.failures_by_frontend.is_empty() {
            writeln!(f, "Failures by frontend:")?;
            for (frontend, count) in &self.failures_by_frontend {
                writeln!(f, "  {}: {}", frontend, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.0}, max={:.0}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Action;

    fn result(status: u16, latency_ms: u64) -> DispatchResult {
        DispatchResult {
            status,
            ok: contracts::is_success_status(status),
            latency_ms,
            error: (status == 0).then(|| "connection refused".to_string()),
            attempt_id: 1,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchAggregator::new();
        let site = DispatchMeta::new("site", "content", "all", Action::Revalidate);
        let docs = DispatchMeta::new("docs", "path", "/about", Action::Revalidate);

        aggregator.update(&site, &result(200, 40));
        aggregator.update(&site, &result(500, 60));
        aggregator.update(&docs, &result(0, 10_000));

        assert_eq!(aggregator.total, 3);
        assert_eq!(aggregator.succeeded, 1);
        assert_eq!(aggregator.http_errors, 1);
        assert_eq!(aggregator.transport_errors, 1);
        assert_eq!(aggregator.failures_by_frontend.get("site"), Some(&1));
        assert_eq!(aggregator.failures_by_frontend.get("docs"), Some(&1));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchAggregator::new();
        let meta = DispatchMeta::new("site", "content", "all", Action::Revalidate);
        for status in [200, 200, 200, 503] {
            aggregator.update(&meta, &result(status, 50));
        }

        let output = aggregator.summary().to_string();
        assert!(output.contains("Dispatches: 4"));
        assert!(output.contains("Succeeded: 3 (75.0%)"));
        assert!(output.contains("site: 1"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let meta = DispatchMeta::new("site", "content", "all", Action::Revalidate);
        record_dispatch(&meta, &result(200, 12));
        record_consecutive_failures(&meta.failure_key(), 2);
        record_alert("slack", false);
        record_queue_item("dropped");
    }
}
