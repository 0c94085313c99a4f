//! Storage and secret-store traits
//!
//! All components depend on these interfaces, never on a concrete backend,
//! so tests can inject in-memory fakes.

use std::time::Duration;

use crate::{
    AttemptFilter, AttemptStats, ClaimedItem, ContractError, DispatchAttempt, NewAttempt,
    QueueItem,
};

/// Shared persistent key-value state
///
/// Updates are plain read-then-write; there is no compare-and-swap, and
/// concurrent writers to one key may race.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, ContractError>;

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), ContractError>;

    /// Read an integer counter, `default` when absent or not an integer
    fn get_or(&self, key: &str, default: i64) -> Result<i64, ContractError> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_i64())
            .unwrap_or(default))
    }
}

/// Append-only log of dispatch attempts
pub trait EventStore: Send + Sync {
    /// Persist a row, filling unset fields with defaults; returns the new id
    fn log(&self, row: NewAttempt) -> Result<i64, ContractError>;

    /// Rows matching every supplied filter, newest first, at most `limit`
    fn last_attempts(
        &self,
        filter: &AttemptFilter,
        limit: usize,
    ) -> Result<Vec<DispatchAttempt>, ContractError>;

    /// Stats over the most recent `n` rows for (frontend, domain[, scope])
    fn stats(
        &self,
        frontend: &str,
        domain: &str,
        scope: Option<&str>,
        n: usize,
    ) -> Result<AttemptStats, ContractError> {
        let rows = self.last_attempts(&AttemptFilter::for_stats(frontend, domain, scope), n)?;
        Ok(AttemptStats::from_attempts(&rows))
    }
}

/// Durable queue of deferred dispatches with visibility timeouts
pub trait RetryQueue: Send + Sync {
    fn enqueue(&self, item: &QueueItem) -> Result<i64, ContractError>;

    /// Lease the oldest visible item, hiding it for `visibility`
    fn claim(&self, visibility: Duration) -> Result<Option<ClaimedItem>, ContractError>;

    /// Remove a claimed item permanently
    fn ack(&self, id: i64) -> Result<(), ContractError>;

    /// Items currently stored, visible or leased
    fn len(&self) -> Result<usize, ContractError>;

    fn is_empty(&self) -> Result<bool, ContractError> {
        Ok(self.len()? == 0)
    }
}

/// Optional external secret vault
pub trait SecretStore: Send + Sync {
    /// Store name (used for logging)
    fn name(&self) -> &str;

    /// Value of the named secret, `None` if no such secret exists
    fn try_resolve(&self, name: &str) -> Result<Option<String>, ContractError>;
}
