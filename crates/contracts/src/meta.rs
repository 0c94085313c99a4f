//! Dispatch metadata and outcome
//!
//! `DispatchMeta` identifies the (frontend, domain, scope) key an attempt is
//! logged and tracked under; `DispatchResult` is what every POST returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DEFAULT_FRONTEND_ID;

/// Well-known domain discriminators
pub mod domains {
    pub const CONTENT: &str = "content";
    pub const TAXONOMY: &str = "taxonomy";
    pub const MENU: &str = "menu";
    pub const PATH: &str = "path";
    pub const TEST: &str = "test";
}

/// Kind of dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Revalidate,
    Test,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revalidate => "revalidate",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revalidate" => Ok(Self::Revalidate),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Metadata attached to a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMeta {
    #[serde(default = "default_frontend")]
    pub frontend: String,

    /// Free-form discriminator (content, taxonomy, path, test, ...)
    #[serde(default)]
    pub domain: String,

    /// A tag, a path, or a label
    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub action: Action,
}

fn default_frontend() -> String {
    DEFAULT_FRONTEND_ID.to_string()
}

impl Default for DispatchMeta {
    fn default() -> Self {
        Self {
            frontend: default_frontend(),
            domain: String::new(),
            scope: String::new(),
            action: Action::Revalidate,
        }
    }
}

impl DispatchMeta {
    pub fn new(
        frontend: impl Into<String>,
        domain: impl Into<String>,
        scope: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            frontend: frontend.into(),
            domain: domain.into(),
            scope: scope.into(),
            action,
        }
    }

    /// Trimmed copy with an empty frontend mapped to `default`
    pub fn normalized(&self) -> Self {
        let frontend = self.frontend.trim();
        Self {
            frontend: if frontend.is_empty() {
                default_frontend()
            } else {
                frontend.to_string()
            },
            domain: self.domain.trim().to_string(),
            scope: self.scope.trim().to_string(),
            action: self.action,
        }
    }

    /// Failure-tracking key for this metadata
    pub fn failure_key(&self) -> FailureKey {
        FailureKey {
            frontend: self.frontend.clone(),
            domain: self.domain.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// (frontend, domain, scope) key of a consecutive-failure counter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailureKey {
    pub frontend: String,
    pub domain: String,
    pub scope: String,
}

impl FailureKey {
    pub fn new(
        frontend: impl Into<String>,
        domain: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            frontend: frontend.into(),
            domain: domain.into(),
            scope: scope.into(),
        }
    }

    /// State-store key holding the counter
    pub fn state_key(&self) -> String {
        format!("failcount.{}.{}.{}", self.frontend, self.domain, self.scope)
    }
}

impl fmt::Display for FailureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.frontend, self.domain, self.scope)
    }
}

/// Outcome of a single dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// HTTP status, 0 when no response was received
    pub status: u16,
    /// `200 <= status < 300`
    pub ok: bool,
    pub latency_ms: u64,
    /// Transport fault message
    pub error: Option<String>,
    /// Event-log id of the row written for this attempt
    pub attempt_id: i64,
}

impl DispatchResult {
    /// Error text, or `HTTP <status>` when the frontend answered
    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(e) if !e.is_empty() => e.clone(),
            _ => format!("HTTP {}", self.status),
        }
    }
}

/// Whether an HTTP status counts as success
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_normalized_defaults_frontend() {
        let meta = DispatchMeta::new("  ", " content ", " all ", Action::Revalidate);
        let norm = meta.normalized();
        assert_eq!(norm.frontend, "default");
        assert_eq!(norm.domain, "content");
        assert_eq!(norm.scope, "all");
    }

    #[test]
    fn test_meta_deserialize_with_missing_fields() {
        let meta: DispatchMeta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta, DispatchMeta::default());
        assert_eq!(meta.action, Action::Revalidate);
    }

    #[test]
    fn test_failure_key_state_key() {
        let key = FailureKey::new("default", "content", "all");
        assert_eq!(key.state_key(), "failcount.default.content.all");
        assert_eq!(key.to_string(), "default/content/all");
    }

    #[test]
    fn test_success_status_bounds() {
        assert!(!is_success_status(199));
        assert!(is_success_status(200));
        assert!(is_success_status(299));
        assert!(!is_success_status(300));
        assert!(!is_success_status(0));
    }

    #[test]
    fn test_failure_reason() {
        let mut result = DispatchResult {
            status: 500,
            ok: false,
            latency_ms: 3,
            error: None,
            attempt_id: 1,
        };
        assert_eq!(result.failure_reason(), "HTTP 500");
        result.error = Some("connection refused".into());
        assert_eq!(result.failure_reason(), "connection refused");
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("TEST".parse::<Action>().unwrap(), Action::Test);
        assert!("purge".parse::<Action>().is_err());
    }
}
