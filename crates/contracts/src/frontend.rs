//! FrontendTarget - a configured revalidation receiver
//!
//! Read-only from the core's perspective; administrators edit the
//! configuration (inline `[[frontends]]` or a separate frontends file).

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Id of the implicit frontend synthesized from legacy settings
pub const DEFAULT_FRONTEND_ID: &str = "default";

/// A frontend service exposing revalidation webhooks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrontendTarget {
    /// Machine name
    pub id: String,

    /// Human-readable label
    #[serde(default)]
    pub label: String,

    /// Tag revalidation webhook
    #[serde(default)]
    pub revalidate_webhook: String,

    /// Path revalidation webhook (falls back to `revalidate_webhook`)
    #[serde(default)]
    pub path_revalidate_webhook: String,

    /// Literal secret, or the name of a secret in the secret store
    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub health_url: String,

    #[serde(default)]
    pub ci_url: String,
}

impl FrontendTarget {
    /// Label for display, falling back to the id
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    /// Endpoint for tag revalidation and test pings, if configured
    pub fn tag_endpoint(&self) -> Option<&str> {
        non_empty(&self.revalidate_webhook)
    }

    /// Endpoint for path revalidation, if configured
    pub fn path_endpoint(&self) -> Option<&str> {
        non_empty(&self.path_revalidate_webhook).or_else(|| self.tag_endpoint())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Source of configured frontends
///
/// Implementations may fail (unreadable file, malformed document); the
/// registry turns any failure into the legacy default.
pub trait FrontendSource: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Load all configured frontends
    fn load(&self) -> Result<Vec<FrontendTarget>, ContractError>;
}
