//! In-memory stores

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use contracts::{
    AttemptFilter, ClaimedItem, ContractError, DispatchAttempt, EventStore, NewAttempt,
    QueueItem, RetryQueue, StateStore,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ContractError> {
    mutex
        .lock()
        .map_err(|_| ContractError::storage("memory", "mutex poisoned"))
}

/// Event log kept in a vector
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    rows: Mutex<Vec<DispatchAttempt>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows written so far
    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventStore for MemoryEventStore {
    fn log(&self, row: NewAttempt) -> Result<i64, ContractError> {
        let mut rows = lock(&self.rows)?;
        let id = rows.len() as i64 + 1;
        rows.push(row.into_attempt(id, Utc::now()));
        Ok(id)
    }

    fn last_attempts(
        &self,
        filter: &AttemptFilter,
        limit: usize,
    ) -> Result<Vec<DispatchAttempt>, ContractError> {
        let rows = lock(&self.rows)?;
        let mut matching: Vec<DispatchAttempt> =
            rows.iter().filter(|r| filter.matches(r)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching.truncate(limit);
        Ok(matching)
    }
}

/// Key-value state kept in a hash map
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, ContractError> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), ContractError> {
        lock(&self.values)?.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug)]
struct QueueEntry {
    body: String,
    visible_after: Instant,
    attempts: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: i64,
    entries: BTreeMap<i64, QueueEntry>,
}

/// FIFO retry queue with visibility timeouts
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw document, bypassing serialization
    pub fn enqueue_raw(&self, body: impl Into<String>) -> Result<i64, ContractError> {
        let mut state = lock(&self.state)?;
        state.next_id += 1;
        let id = state.next_id;
        state.entries.insert(
            id,
            QueueEntry {
                body: body.into(),
                visible_after: Instant::now(),
                attempts: 0,
            },
        );
        Ok(id)
    }
}

impl RetryQueue for MemoryQueue {
    fn enqueue(&self, item: &QueueItem) -> Result<i64, ContractError> {
        self.enqueue_raw(item.to_json()?)
    }

    fn claim(&self, visibility: Duration) -> Result<Option<ClaimedItem>, ContractError> {
        let mut state = lock(&self.state)?;
        let now = Instant::now();
        let Some((&id, entry)) = state
            .entries
            .iter_mut()
            .find(|(_, entry)| entry.visible_after <= now)
        else {
            return Ok(None);
        };
        entry.visible_after = now + visibility;
        entry.attempts += 1;
        Ok(Some(ClaimedItem {
            id,
            attempts: entry.attempts,
            body: entry.body.clone(),
        }))
    }

    fn ack(&self, id: i64) -> Result<(), ContractError> {
        lock(&self.state)?.entries.remove(&id);
        Ok(())
    }

    fn len(&self) -> Result<usize, ContractError> {
        Ok(lock(&self.state)?.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Action, DispatchMeta};

    fn row(frontend: &str, domain: &str, scope: &str, ok: bool) -> NewAttempt {
        NewAttempt {
            frontend: Some(frontend.into()),
            domain: Some(domain.into()),
            scope: Some(scope.into()),
            ok: Some(ok),
            ..Default::default()
        }
    }

    #[test]
    fn test_log_assigns_monotonic_ids() {
        let store = MemoryEventStore::new();
        let a = store.log(NewAttempt::default()).unwrap();
        let b = store.log(NewAttempt::default()).unwrap();
        assert!(b > a);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_last_attempts_newest_first_and_limited() {
        let store = MemoryEventStore::new();
        for scope in ["a", "b", "c"] {
            store.log(row("site", "content", scope, true)).unwrap();
        }
        let rows = store.last_attempts(&AttemptFilter::default(), 2).unwrap();
        let scopes: Vec<_> = rows.iter().map(|r| r.scope.as_str()).collect();
        assert_eq!(scopes, vec!["c", "b"]);
    }

    #[test]
    fn test_last_attempts_filters() {
        let store = MemoryEventStore::new();
        store.log(row("site", "content", "a", true)).unwrap();
        store.log(row("other", "content", "a", true)).unwrap();
        store
            .log(NewAttempt {
                action: Some(Action::Test),
                ..row("site", "test", "ping", true)
            })
            .unwrap();

        let filter = AttemptFilter {
            frontend: Some("site".into()),
            ..Default::default()
        };
        assert_eq!(store.last_attempts(&filter, 10).unwrap().len(), 2);

        let filter = AttemptFilter {
            action: Some(Action::Test),
            ..Default::default()
        };
        let rows = store.last_attempts(&filter, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scope, "ping");
    }

    #[test]
    fn test_stats_over_recent_rows() {
        let store = MemoryEventStore::new();
        store.log(row("site", "content", "a", false)).unwrap();
        for _ in 0..3 {
            store.log(row("site", "content", "a", true)).unwrap();
        }
        store.log(row("site", "content", "b", false)).unwrap();

        let stats = store.stats("site", "content", Some("a"), 3).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.success_rate, Some(100.0));

        let stats = store.stats("site", "content", None, 50).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.success_rate, Some(60.0));

        let stats = store.stats("site", "taxonomy", None, 50).unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.success_rate, None);
        assert_eq!(stats.p95, None);
    }

    #[test]
    fn test_state_get_or() {
        let state = MemoryStateStore::new();
        assert_eq!(state.get_or("missing", 0).unwrap(), 0);
        state.set("k", serde_json::json!(4)).unwrap();
        assert_eq!(state.get_or("k", 0).unwrap(), 4);
        state.set("k", serde_json::json!("text")).unwrap();
        assert_eq!(state.get_or("k", 9).unwrap(), 9);
    }

    #[test]
    fn test_queue_claim_hides_item_until_ack() {
        let queue = MemoryQueue::new();
        let item = QueueItem::new(
            "https://site.example/api/revalidate",
            "",
            serde_json::json!({"tag": "all"}),
            DispatchMeta::default(),
        );
        let id = queue.enqueue(&item).unwrap();

        let claimed = queue.claim(Duration::from_secs(60)).unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.item().unwrap(), item);

        // leased, so nothing else is visible
        assert!(queue.claim(Duration::from_secs(60)).unwrap().is_none());
        assert_eq!(queue.len().unwrap(), 1);

        queue.ack(id).unwrap();
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_queue_redelivers_after_visibility_expires() {
        let queue = MemoryQueue::new();
        queue.enqueue_raw("{}").unwrap();

        let first = queue.claim(Duration::ZERO).unwrap().unwrap();
        let second = queue.claim(Duration::ZERO).unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.attempts, 2);
    }

    #[test]
    fn test_queue_fifo() {
        let queue = MemoryQueue::new();
        let a = queue.enqueue_raw("{}").unwrap();
        let b = queue.enqueue_raw("{}").unwrap();
        assert_eq!(queue.claim(Duration::from_secs(5)).unwrap().unwrap().id, a);
        assert_eq!(queue.claim(Duration::from_secs(5)).unwrap().unwrap().id, b);
    }
}
