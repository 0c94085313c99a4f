//! # Dispatcher
//!
//! Revalidation dispatch pipeline.
//!
//! - `Dispatcher`: authenticated webhook POST, one event-log row per attempt,
//!   consecutive-failure tracking, alert hand-off
//! - `Alerter` and its channels (Slack, email)
//! - `RetryWorker`: drains the durable retry queue
//! - `RevalidationService`: tag / path / entity / test triggers, immediate or
//!   queued
//! - `DiagnosticRunner`: ad hoc query checks

pub mod alerter;
pub mod channels;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod service;
pub mod tracker;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use alerter::{AlertChannel, AlertReport, Alerter, FailureNotifier};
pub use channels::{EmailChannel, Mailer, SendmailMailer, SlackChannel};
pub use diagnostics::{sanitize_label, CheckRecord, DiagnosticRunner};
pub use dispatcher::{build_client, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::{AlertError, DispatcherError};
pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use service::{
    Dispatched, Enqueued, FrontendSelector, Request, RevalidationService, DEFAULT_TEST_SCOPE,
};
pub use tracker::{FailureTracker, FailureTransition};
pub use worker::{DrainReport, ItemOutcome, RetryWorker};
