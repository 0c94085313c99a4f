//! SqliteStore - event log, state and retry queue in one SQLite database

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    AttemptFilter, ClaimedItem, ContractError, DispatchAttempt, EventStore, NewAttempt,
    QueueItem, RetryQueue, StateStore,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, instrument};

const BACKEND: &str = "sqlite";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS revalidator_event (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    frontend TEXT NOT NULL,
    domain TEXT NOT NULL,
    scope TEXT NOT NULL,
    action TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    http_code INTEGER NOT NULL,
    ok INTEGER NOT NULL,
    latency_ms INTEGER NOT NULL,
    message TEXT NOT NULL,
    response TEXT
);
CREATE INDEX IF NOT EXISTS revalidator_event_key
    ON revalidator_event (frontend, domain, scope);
CREATE INDEX IF NOT EXISTS revalidator_event_created
    ON revalidator_event (created_at);

CREATE TABLE IF NOT EXISTS revalidator_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS revalidator_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    visible_after INTEGER NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0
);
";

fn storage_err(e: rusqlite::Error) -> ContractError {
    ContractError::storage(BACKEND, e.to_string())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// SQLite-backed implementation of every storage trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file; `:memory:` opens an ephemeral one
    #[instrument(name = "sqlite_store_open", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(storage_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(storage_err)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, ContractError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, ContractError> {
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        debug!("SQLite schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ContractError> {
        self.conn
            .lock()
            .map_err(|_| ContractError::storage(BACKEND, "connection mutex poisoned"))
    }
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<DispatchAttempt> {
    let created_ms: i64 = row.get("created_at")?;
    let action: String = row.get("action")?;
    let http_code: i64 = row.get("http_code")?;
    let latency_ms: i64 = row.get("latency_ms")?;
    Ok(DispatchAttempt {
        id: row.get("id")?,
        created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or_default(),
        frontend: row.get("frontend")?,
        domain: row.get("domain")?,
        scope: row.get("scope")?,
        action: action.parse().unwrap_or_default(),
        endpoint: row.get("endpoint")?,
        http_code: u16::try_from(http_code).unwrap_or(0),
        ok: row.get("ok")?,
        latency_ms: u64::try_from(latency_ms).unwrap_or(0),
        message: row.get("message")?,
        response_snippet: row.get("response")?,
    })
}

impl EventStore for SqliteStore {
    fn log(&self, row: NewAttempt) -> Result<i64, ContractError> {
        let conn = self.lock()?;
        // id is assigned by SQLite; the placeholder is discarded
        let attempt = row.into_attempt(0, Utc::now());
        conn.execute(
            "INSERT INTO revalidator_event
                (created_at, frontend, domain, scope, action, endpoint,
                 http_code, ok, latency_ms, message, response)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                attempt.created_at.timestamp_millis(),
                attempt.frontend,
                attempt.domain,
                attempt.scope,
                attempt.action.as_str(),
                attempt.endpoint,
                attempt.http_code,
                attempt.ok,
                attempt.latency_ms as i64,
                attempt.message,
                attempt.response_snippet,
            ],
        )
        .map_err(storage_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn last_attempts(
        &self,
        filter: &AttemptFilter,
        limit: usize,
    ) -> Result<Vec<DispatchAttempt>, ContractError> {
        let mut sql = String::from("SELECT * FROM revalidator_event WHERE 1 = 1");
        let mut values: Vec<Value> = Vec::new();
        let text_filters = [
            ("frontend", filter.frontend.as_deref()),
            ("domain", filter.domain.as_deref()),
            ("scope", filter.scope.as_deref()),
            ("action", filter.action.as_ref().map(|a| a.as_str())),
        ];
        for (column, value) in text_filters {
            if let Some(value) = value {
                values.push(Value::Text(value.to_string()));
                sql.push_str(&format!(" AND {column} = ?{}", values.len()));
            }
        }
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        sql.push_str(&format!(
            " ORDER BY created_at DESC, id DESC LIMIT ?{}",
            values.len()
        ));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), attempt_from_row)
            .map_err(storage_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)
    }
}

impl StateStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, ContractError> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM revalidator_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(ContractError::from)
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), ContractError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO revalidator_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value.to_string()],
        )
        .map_err(storage_err)?;
        Ok(())
    }
}

impl RetryQueue for SqliteStore {
    fn enqueue(&self, item: &QueueItem) -> Result<i64, ContractError> {
        let body = item.to_json()?;
        let conn = self.lock()?;
        let now = now_millis();
        conn.execute(
            "INSERT INTO revalidator_queue (body, created_at, visible_after, attempts)
             VALUES (?1, ?2, ?2, 0)",
            params![body, now],
        )
        .map_err(storage_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn claim(&self, visibility: Duration) -> Result<Option<ClaimedItem>, ContractError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err)?;
        let now = now_millis();
        let found: Option<(i64, String, u32)> = tx
            .query_row(
                "SELECT id, body, attempts FROM revalidator_queue
                 WHERE visible_after <= ?1 ORDER BY id LIMIT 1",
                params![now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(storage_err)?;

        let Some((id, body, attempts)) = found else {
            return Ok(None);
        };
        let visible_after = now + i64::try_from(visibility.as_millis()).unwrap_or(i64::MAX / 2);
        tx.execute(
            "UPDATE revalidator_queue SET visible_after = ?1, attempts = attempts + 1
             WHERE id = ?2",
            params![visible_after, id],
        )
        .map_err(storage_err)?;
        tx.commit().map_err(storage_err)?;

        Ok(Some(ClaimedItem {
            id,
            attempts: attempts + 1,
            body,
        }))
    }

    fn ack(&self, id: i64) -> Result<(), ContractError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM revalidator_queue WHERE id = ?1", params![id])
            .map_err(storage_err)?;
        Ok(())
    }

    fn len(&self) -> Result<usize, ContractError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM revalidator_queue", [], |row| {
                row.get(0)
            })
            .map_err(storage_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
