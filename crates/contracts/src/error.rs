//! Layered error definitions
//!
//! Categorized by source: config / storage / secret store / serialization

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Storage Errors =====
    /// Event log / state / queue backend failure
    #[error("storage error in '{backend}': {message}")]
    Storage { backend: String, message: String },

    // ===== Secret Store Errors =====
    /// Secret lookup failed (distinct from "not found")
    #[error("secret store '{store}' lookup failed: {message}")]
    SecretLookup { store: String, message: String },

    // ===== Frontend Source Errors =====
    /// Frontend list could not be loaded
    #[error("frontend source '{source_name}' failed: {message}")]
    FrontendSource {
        source_name: String,
        message: String,
    },

    // ===== General Errors =====
    /// JSON (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create storage error
    pub fn storage(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create secret lookup error
    pub fn secret_lookup(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SecretLookup {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Create frontend source error
    pub fn frontend_source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FrontendSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
