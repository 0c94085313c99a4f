//! DiagnosticRunner - ad hoc query checks against a diagnostics endpoint
//!
//! Results go to the state store under `check.{label}`; the event log and
//! failure counters are not touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::{truncate_chars, DiagnosticCheck, RevalidatorConfig, StateStore, RESPONSE_MAX_CHARS};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::DispatcherError;

const ERROR_MAX_CHARS: usize = 1000;

/// Last recorded outcome of a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Unix seconds
    pub t: i64,
    pub ok: bool,
    /// HTTP status, 0 when no response was received
    pub code: u16,
    /// Response snippet, or the error text
    pub body: String,
}

pub struct DiagnosticRunner {
    client: Client,
    endpoint: Option<String>,
    timeout: Duration,
    state: Arc<dyn StateStore>,
}

impl DiagnosticRunner {
    pub fn new(
        client: Client,
        endpoint: Option<String>,
        timeout: Duration,
        state: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            timeout,
            state,
        }
    }

    pub fn from_config(config: &RevalidatorConfig, client: Client, state: Arc<dyn StateStore>) -> Self {
        Self::new(
            client,
            config.diagnostics.endpoint.clone(),
            config.timeouts.diagnostic(),
            state,
        )
    }

    /// State key of a check label
    pub fn state_key(label: &str) -> String {
        format!("check.{}", sanitize_label(label))
    }

    /// Run one check and store its record
    #[instrument(name = "diagnostics_run", skip(self, check), fields(label = %check.label))]
    pub async fn run(&self, check: &DiagnosticCheck) -> Result<CheckRecord, DispatcherError> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            DispatcherError::InvalidRequest("no diagnostics endpoint configured".into())
        })?;

        let sent = self
            .client
            .post(endpoint)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "query": check.query }))
            .send()
            .await;

        let t = Utc::now().timestamp();
        let record = match sent {
            Ok(response) => {
                let code = response.status().as_u16();
                let body = match response.text().await {
                    Ok(text) => truncate_chars(&text, RESPONSE_MAX_CHARS),
                    Err(e) => truncate_chars(&e.to_string(), ERROR_MAX_CHARS),
                };
                CheckRecord {
                    t,
                    ok: contracts::is_success_status(code),
                    code,
                    body,
                }
            }
            Err(e) => CheckRecord {
                t,
                ok: false,
                code: 0,
                body: truncate_chars(&e.to_string(), ERROR_MAX_CHARS),
            },
        };

        if record.ok {
            info!(http_status = record.code, "Diagnostic check passed");
        } else {
            warn!(http_status = record.code, "Diagnostic check failed");
        }

        let value = serde_json::to_value(&record)
            .map_err(|e| DispatcherError::Store(e.into()))?;
        self.state
            .set(&Self::state_key(&check.label), value)
            .map_err(DispatcherError::Store)?;
        Ok(record)
    }

    /// Run every check, in order
    pub async fn run_all(
        &self,
        checks: &[DiagnosticCheck],
    ) -> Result<Vec<(String, CheckRecord)>, DispatcherError> {
        let mut out = Vec::with_capacity(checks.len());
        for check in checks {
            out.push((check.label.clone(), self.run(check).await?));
        }
        Ok(out)
    }

    /// Stored record of a label, if any
    pub fn last_result(&self, label: &str) -> Result<Option<CheckRecord>, DispatcherError> {
        let Some(value) = self
            .state
            .get(&Self::state_key(label))
            .map_err(DispatcherError::Store)?
        else {
            return Ok(None);
        };
        Ok(serde_json::from_value(value).ok())
    }
}

/// Lower-case, with runs of characters outside `[a-z0-9_-]` replaced by `_`
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut in_run = false;
    for c in label.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}
