//! Dispatcher - authenticated webhook POST with logging and failure tracking

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    is_success_status, DispatchMeta, DispatchResult, EventStore, NewAttempt, RevalidatorConfig,
    StateStore, RESPONSE_MAX_CHARS,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

use crate::alerter::FailureNotifier;
use crate::error::DispatcherError;
use crate::tracker::{FailureTracker, FailureTransition};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Header carrying the shared secret
    pub secret_header: String,
    /// Timeout of revalidation calls
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            secret_header: "X-Shared-Secret".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl DispatcherConfig {
    pub fn from_config(config: &RevalidatorConfig) -> Self {
        Self {
            secret_header: config.http.secret_header.clone(),
            timeout: config.timeouts.revalidate(),
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    events: Arc<dyn EventStore>,
    state: Arc<dyn StateStore>,
    notifier: Option<Arc<dyn FailureNotifier>>,
    client: Option<Client>,
}

impl DispatcherBuilder {
    pub fn new(events: Arc<dyn EventStore>, state: Arc<dyn StateStore>) -> Self {
        Self {
            config: DispatcherConfig::default(),
            events,
            state,
            notifier: None,
            client: None,
        }
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Called after every failure with the new consecutive count
    pub fn notifier(mut self, notifier: Arc<dyn FailureNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Share an existing HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let client = match self.client {
            Some(client) => client,
            None => build_client()?,
        };
        Ok(Dispatcher {
            client,
            config: self.config,
            events: self.events,
            tracker: FailureTracker::new(self.state),
            notifier: self.notifier,
        })
    }
}

/// HTTP client shared by the dispatcher, alert channels and diagnostics
pub fn build_client() -> Result<Client, DispatcherError> {
    Ok(Client::builder()
        .user_agent(concat!("revalidator/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// What came back from the wire
struct Exchange {
    status: u16,
    body: Option<String>,
    error: Option<String>,
}

/// Posts revalidation webhooks and records every attempt
pub struct Dispatcher {
    client: Client,
    config: DispatcherConfig,
    events: Arc<dyn EventStore>,
    tracker: FailureTracker,
    notifier: Option<Arc<dyn FailureNotifier>>,
}

impl Dispatcher {
    pub fn builder(events: Arc<dyn EventStore>, state: Arc<dyn StateStore>) -> DispatcherBuilder {
        DispatcherBuilder::new(events, state)
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn events(&self) -> &Arc<dyn EventStore> {
        &self.events
    }

    pub fn tracker(&self) -> &FailureTracker {
        &self.tracker
    }

    /// POST `payload` to `endpoint` with the revalidation timeout
    ///
    /// Exactly one event-log row is written per call. Network failures come
    /// back as a non-ok `DispatchResult`; the only error is a failed log write.
    pub async fn post(
        &self,
        endpoint: &str,
        secret: &str,
        payload: &serde_json::Value,
        meta: DispatchMeta,
    ) -> Result<DispatchResult, DispatcherError> {
        self.post_with_timeout(endpoint, secret, payload, meta, self.config.timeout)
            .await
    }

    #[instrument(
        name = "dispatcher_post",
        skip_all,
        fields(
            endpoint = %endpoint,
            frontend = tracing::field::Empty,
            domain = tracing::field::Empty,
            scope = tracing::field::Empty,
        )
    )]
    pub async fn post_with_timeout(
        &self,
        endpoint: &str,
        secret: &str,
        payload: &serde_json::Value,
        meta: DispatchMeta,
        timeout: Duration,
    ) -> Result<DispatchResult, DispatcherError> {
        let meta = meta.normalized();
        let span = tracing::Span::current();
        span.record("frontend", meta.frontend.as_str());
        span.record("domain", meta.domain.as_str());
        span.record("scope", meta.scope.as_str());

        let start = Instant::now();
        let exchange = self.send(endpoint, secret, payload, timeout).await;
        let latency_ms = (start.elapsed().as_secs_f64() * 1000.0).round() as u64;
        let ok = exchange.error.is_none() && is_success_status(exchange.status);

        let attempt_id = self
            .events
            .log(NewAttempt {
                frontend: Some(meta.frontend.clone()),
                domain: Some(meta.domain.clone()),
                scope: Some(meta.scope.clone()),
                action: Some(meta.action),
                endpoint: Some(endpoint.to_string()),
                http_code: Some(exchange.status),
                ok: Some(ok),
                latency_ms: Some(latency_ms),
                message: exchange.error.clone(),
                response_snippet: exchange.body,
                ..Default::default()
            })
            .map_err(|e| {
                error!(error = %e, "Failed to write event log row");
                DispatcherError::Store(e)
            })?;

        let result = DispatchResult {
            status: exchange.status,
            ok,
            latency_ms,
            error: exchange.error,
            attempt_id,
        };
        observability::record_dispatch(&meta, &result);
        debug!(
            http_status = result.status,
            ok = result.ok,
            latency_ms = result.latency_ms,
            secret_header = !secret.is_empty(),
            "Dispatch completed"
        );

        self.track(&meta, &result).await;
        Ok(result)
    }

    async fn send(
        &self,
        endpoint: &str,
        secret: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Exchange {
        let mut request = self
            .client
            .post(endpoint)
            .timeout(timeout)
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        if !secret.is_empty() {
            request = request.header(self.config.secret_header.as_str(), secret);
        }

        let mut response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Exchange {
                    status: 0,
                    body: None,
                    error: Some(describe_error(&e, timeout)),
                }
            }
        };

        let status = response.status().as_u16();
        let body = read_snippet(&mut response).await;
        Exchange {
            status,
            body: Some(body),
            error: None,
        }
    }

    async fn track(&self, meta: &DispatchMeta, result: &DispatchResult) {
        let key = meta.failure_key();
        let transition = match self.tracker.record(&key, result.ok) {
            Ok(t) => t,
            Err(e) => {
                warn!(key = %key, error = %e, "Failure tracking skipped");
                return;
            }
        };

        match transition {
            FailureTransition::Unchanged => {}
            FailureTransition::Recovered { previous } => {
                observability::record_consecutive_failures(&key, 0);
                info!(
                    frontend = %key.frontend,
                    domain = %key.domain,
                    scope = %key.scope,
                    count = previous,
                    "Revalidation recovered after {previous} failures"
                );
            }
            FailureTransition::Failed { count } => {
                observability::record_consecutive_failures(&key, count);
                let reason = result.failure_reason();
                error!(
                    frontend = %key.frontend,
                    domain = %key.domain,
                    scope = %key.scope,
                    count = count,
                    error = %reason,
                    "Revalidation failed"
                );
                if let Some(notifier) = &self.notifier {
                    if let Err(e) = notifier.notify(&key, count, &reason).await {
                        warn!(key = %key, error = %e, "Alert dispatch failed");
                    }
                }
            }
        }
    }
}

/// Read at most `RESPONSE_MAX_CHARS` bytes of the body
async fn read_snippet(response: &mut reqwest::Response) -> String {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < RESPONSE_MAX_CHARS {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = (RESPONSE_MAX_CHARS - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Response body read interrupted");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Error text with its source chain
fn describe_error(e: &reqwest::Error, timeout: Duration) -> String {
    if e.is_timeout() {
        return format!("request timed out after {timeout:?}");
    }
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
