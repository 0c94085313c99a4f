//! Test fixtures: a scripted local frontend and failing fakes

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Router;
use contracts::{AttemptFilter, ContractError, DispatchAttempt, EventStore, FailureKey, NewAttempt};

use crate::alerter::{AlertReport, FailureNotifier};
use crate::error::AlertError;

/// A request received by the fixture
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

#[derive(Clone, Default)]
struct FixtureState {
    seen: Arc<Mutex<Vec<Seen>>>,
    statuses: Arc<Mutex<VecDeque<u16>>>,
    body: Arc<String>,
}

/// Local HTTP server answering with scripted statuses (200 once exhausted)
pub struct Fixture {
    base: String,
    state: FixtureState,
}

impl Fixture {
    pub async fn start(statuses: &[u16]) -> Self {
        Self::with_body(statuses, r#"{"revalidated":true}"#).await
    }

    pub async fn with_body(statuses: &[u16], body: impl Into<String>) -> Self {
        let state = FixtureState {
            seen: Arc::default(),
            statuses: Arc::new(Mutex::new(statuses.iter().copied().collect())),
            body: Arc::new(body.into()),
        };
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.state.seen.lock().unwrap().len()
    }
}

async fn handle(
    State(state): State<FixtureState>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state.seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    let status = state.statuses.lock().unwrap().pop_front().unwrap_or(200);
    (
        StatusCode::from_u16(status).unwrap(),
        state.body.as_ref().clone(),
    )
}

/// URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/revalidate")
}

/// Event store whose writes always fail
pub struct FailingEventStore;

impl EventStore for FailingEventStore {
    fn log(&self, _row: NewAttempt) -> Result<i64, ContractError> {
        Err(ContractError::storage("test", "disk full"))
    }

    fn last_attempts(
        &self,
        _filter: &AttemptFilter,
        _limit: usize,
    ) -> Result<Vec<DispatchAttempt>, ContractError> {
        Ok(Vec::new())
    }
}

/// Records every notification
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<(FailureKey, i64, String)>>,
}

#[async_trait]
impl FailureNotifier for RecordingNotifier {
    async fn notify(
        &self,
        key: &FailureKey,
        consecutive_failures: i64,
        message: &str,
    ) -> Result<AlertReport, AlertError> {
        self.calls
            .lock()
            .unwrap()
            .push((key.clone(), consecutive_failures, message.to_string()));
        Ok(AlertReport::default())
    }
}

/// Notifier that always errors
pub struct FailingNotifier;

#[async_trait]
impl FailureNotifier for FailingNotifier {
    async fn notify(
        &self,
        _key: &FailureKey,
        _consecutive_failures: i64,
        _message: &str,
    ) -> Result<AlertReport, AlertError> {
        Err(AlertError::Mail("smtp relay down".into()))
    }
}
