//! Retry queue items
//!
//! Items are stored as JSON so a worker can tell a malformed item apart from
//! a dispatch failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DispatchMeta;

/// A deferred dispatch request
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueItem {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub meta: DispatchMeta,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl QueueItem {
    pub fn new(
        endpoint: impl Into<String>,
        secret: impl Into<String>,
        payload: serde_json::Value,
        meta: DispatchMeta,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: secret.into(),
            payload,
            meta,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// Secrets stay out of debug output
impl fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueItem")
            .field("endpoint", &self.endpoint)
            .field("secret", &if self.secret.is_empty() { "" } else { "***" })
            .field("payload", &self.payload)
            .field("meta", &self.meta)
            .finish()
    }
}

/// An item leased from the queue, invisible to other workers until the lease expires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedItem {
    pub id: i64,
    /// Number of times this item has been claimed, including this one
    pub attempts: u32,
    /// Stored JSON document
    pub body: String,
}

impl ClaimedItem {
    /// Decode the stored document
    pub fn item(&self) -> Result<QueueItem, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}
