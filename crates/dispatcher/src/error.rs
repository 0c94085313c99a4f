//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
///
/// Network failures are not errors: they are reported through
/// `DispatchResult` and the event log.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No frontend with this id
    #[error("unknown frontend '{frontend}'")]
    UnknownFrontend { frontend: String },

    /// Frontend has no webhook for the requested action
    #[error("frontend '{frontend}' has no {kind} endpoint configured")]
    NoEndpoint { frontend: String, kind: String },

    /// Request rejected before any network call
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP client could not be constructed
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Event log or state write failed
    #[error("store error: {0}")]
    Store(#[source] ContractError),

    /// Retry queue failure
    #[error("queue error: {0}")]
    Queue(#[source] ContractError),
}

impl DispatcherError {
    pub fn unknown_frontend(frontend: impl Into<String>) -> Self {
        Self::UnknownFrontend {
            frontend: frontend.into(),
        }
    }

    pub fn no_endpoint(frontend: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::NoEndpoint {
            frontend: frontend.into(),
            kind: kind.into(),
        }
    }

    /// Configuration problems reported to interactive callers
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownFrontend { .. } | Self::NoEndpoint { .. } | Self::InvalidRequest(_)
        )
    }
}

/// Alert delivery errors
#[derive(Debug, Error)]
pub enum AlertError {
    /// Transport failure talking to a webhook
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook answered with a non-success status
    #[error("webhook returned HTTP {status}")]
    Status { status: u16 },

    /// Mail could not be handed to the mail transport
    #[error("mail error: {0}")]
    Mail(String),

    /// Delivery exceeded its time budget
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
