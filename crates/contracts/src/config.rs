//! RevalidatorConfig - Config Loader output
//!
//! Storage, HTTP, timeouts, frontends, secret store, alerting, queue and
//! diagnostics settings. Every section is optional.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{FrontendTarget, DEFAULT_FRONTEND_ID};

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevalidatorConfig {
    /// Separately administered frontends file (takes precedence over `frontends`)
    #[serde(default)]
    pub frontends_file: Option<PathBuf>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Settings the implicit `default` frontend is synthesized from
    #[serde(default)]
    pub legacy: LegacySettings,

    #[serde(default)]
    pub frontends: Vec<FrontendTarget>,

    #[serde(default)]
    pub secrets: SecretStoreConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "revalidator.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Header carrying the shared secret
    #[serde(default = "default_secret_header")]
    pub secret_header: String,
}

fn default_secret_header() -> String {
    "X-Shared-Secret".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            secret_header: default_secret_header(),
        }
    }
}

/// Per call-site request timeouts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Tag/path revalidation and test pings
    #[serde(default = "default_revalidate_secs")]
    pub revalidate_secs: u64,

    /// Ad hoc diagnostic checks
    #[serde(default = "default_diagnostic_secs")]
    pub diagnostic_secs: u64,

    /// Alert delivery
    #[serde(default = "default_alert_secs")]
    pub alert_secs: u64,
}

fn default_revalidate_secs() -> u64 {
    10
}

fn default_diagnostic_secs() -> u64 {
    15
}

fn default_alert_secs() -> u64 {
    5
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            revalidate_secs: default_revalidate_secs(),
            diagnostic_secs: default_diagnostic_secs(),
            alert_secs: default_alert_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }

    pub fn diagnostic(&self) -> Duration {
        Duration::from_secs(self.diagnostic_secs)
    }

    pub fn alert(&self) -> Duration {
        Duration::from_secs(self.alert_secs)
    }
}

/// Legacy single-frontend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacySettings {
    #[serde(default)]
    pub revalidate_webhook: String,
    #[serde(default)]
    pub path_revalidate_webhook: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub health_url: String,
    #[serde(default)]
    pub ci_url: String,
}

impl LegacySettings {
    /// The implicit `default` frontend
    pub fn default_frontend(&self) -> FrontendTarget {
        FrontendTarget {
            id: DEFAULT_FRONTEND_ID.to_string(),
            label: "Default".to_string(),
            revalidate_webhook: self.revalidate_webhook.clone(),
            path_revalidate_webhook: self.path_revalidate_webhook.clone(),
            secret: self.secret.clone(),
            health_url: self.health_url.clone(),
            ci_url: self.ci_url.clone(),
        }
    }
}

/// Secret-store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    /// No vault; every reference is a literal secret
    #[default]
    None,
    /// Environment variables
    Env,
    /// One file per secret in a directory
    File,
}

/// Secret-store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretStoreConfig {
    #[serde(default)]
    pub backend: SecretBackend,

    /// Prefix for the `env` backend
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// Directory for the `file` backend
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_env_prefix() -> String {
    "REVALIDATOR_SECRET_".to_string()
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::None,
            env_prefix: default_env_prefix(),
            dir: None,
        }
    }
}

/// Failure alerting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Consecutive failures before alerting; `<= 0` disables alerting
    #[serde(default)]
    pub threshold: i64,

    #[serde(default)]
    pub slack_webhook: Option<String>,

    #[serde(default)]
    pub emails: Vec<String>,

    /// sendmail-compatible binary used for email alerts
    #[serde(default)]
    pub sendmail_path: Option<PathBuf>,

    /// Sender address for email alerts
    #[serde(default)]
    pub from: Option<String>,
}

impl AlertConfig {
    /// Slack webhook, if set to a non-empty value
    pub fn slack_webhook(&self) -> Option<&str> {
        self.slack_webhook
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Retry queue settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long a claimed item stays hidden before redelivery
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u64,

    /// Time budget of one worker drain run
    #[serde(default = "default_max_runtime")]
    pub max_runtime_secs: u64,
}

fn default_visibility_timeout() -> u64 {
    60
}

fn default_max_runtime() -> u64 {
    60
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: default_visibility_timeout(),
            max_runtime_secs: default_max_runtime(),
        }
    }
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn max_runtime(&self) -> Duration {
        Duration::from_secs(self.max_runtime_secs)
    }
}

/// Ad hoc diagnostic checks against a query endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub checks: Vec<DiagnosticCheck>,
}

/// A labelled query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    pub label: String,
    pub query: String,
}
