//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// At least one dispatch did not succeed
    #[error("{failed} of {total} dispatches failed")]
    DispatchFailed { failed: usize, total: usize },

    /// No diagnostic check matched
    #[error("No diagnostic check labelled '{label}'")]
    UnknownCheck { label: String },

    /// At least one diagnostic check did not pass
    #[error("{failed} of {total} checks failed")]
    ChecksFailed { failed: usize, total: usize },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn unknown_check(label: impl Into<String>) -> Self {
        Self::UnknownCheck {
            label: label.into(),
        }
    }
}
