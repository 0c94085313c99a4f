//! Configuration validation
//!
//! Rules:
//! - frontend ids non-empty and unique
//! - every configured URL is an absolute http(s) URL
//! - alert email addresses are well-formed
//! - timeouts and the queue visibility timeout are > 0
//! - the file secret backend has a directory
//! - diagnostic check labels unique, queries non-empty

use std::collections::HashSet;

use contracts::{ContractError, RevalidatorConfig, SecretBackend};
use validator::{ValidateEmail, ValidateUrl};

/// Validate a RevalidatorConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RevalidatorConfig) -> Result<(), ContractError> {
    validate_frontends(config)?;
    validate_legacy(config)?;
    validate_timeouts(config)?;
    validate_secrets(config)?;
    validate_alerts(config)?;
    validate_queue(config)?;
    validate_diagnostics(config)?;
    Ok(())
}

/// Empty values are allowed (meaning "not configured")
fn validate_http_url(field: impl Into<String>, value: &String) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    let scheme_ok = value.starts_with("http://") || value.starts_with("https://");
    if !scheme_ok || !value.validate_url() {
        return Err(ContractError::config_validation(
            field,
            format!("'{value}' is not an absolute http(s) URL"),
        ));
    }
    Ok(())
}

fn validate_frontends(config: &RevalidatorConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, fe) in config.frontends.iter().enumerate() {
        if fe.id.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("frontends[{idx}].id"),
                "frontend id cannot be empty",
            ));
        }
        if !seen.insert(fe.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("frontends[id={}]", fe.id),
                "duplicate frontend id",
            ));
        }
        validate_http_url(
            format!("frontends[{}].revalidate_webhook", fe.id),
            &fe.revalidate_webhook,
        )?;
        validate_http_url(
            format!("frontends[{}].path_revalidate_webhook", fe.id),
            &fe.path_revalidate_webhook,
        )?;
        validate_http_url(format!("frontends[{}].health_url", fe.id), &fe.health_url)?;
        validate_http_url(format!("frontends[{}].ci_url", fe.id), &fe.ci_url)?;
    }
    Ok(())
}

fn validate_legacy(config: &RevalidatorConfig) -> Result<(), ContractError> {
    let legacy = &config.legacy;
    validate_http_url("legacy.revalidate_webhook", &legacy.revalidate_webhook)?;
    validate_http_url(
        "legacy.path_revalidate_webhook",
        &legacy.path_revalidate_webhook,
    )?;
    validate_http_url("legacy.health_url", &legacy.health_url)?;
    validate_http_url("legacy.ci_url", &legacy.ci_url)?;
    Ok(())
}

fn validate_timeouts(config: &RevalidatorConfig) -> Result<(), ContractError> {
    let t = &config.timeouts;
    for (field, secs) in [
        ("timeouts.revalidate_secs", t.revalidate_secs),
        ("timeouts.diagnostic_secs", t.diagnostic_secs),
        ("timeouts.alert_secs", t.alert_secs),
    ] {
        if secs == 0 {
            return Err(ContractError::config_validation(
                field,
                "timeout must be > 0",
            ));
        }
    }
    Ok(())
}

fn validate_secrets(config: &RevalidatorConfig) -> Result<(), ContractError> {
    if config.secrets.backend == SecretBackend::File && config.secrets.dir.is_none() {
        return Err(ContractError::config_validation(
            "secrets.dir",
            "the file secret backend requires a directory",
        ));
    }
    Ok(())
}

fn validate_alerts(config: &RevalidatorConfig) -> Result<(), ContractError> {
    let alerts = &config.alerts;
    if let Some(slack) = &alerts.slack_webhook {
        validate_http_url("alerts.slack_webhook", slack)?;
    }
    for (idx, email) in alerts.emails.iter().enumerate() {
        if !email.validate_email() {
            return Err(ContractError::config_validation(
                format!("alerts.emails[{idx}]"),
                format!("'{email}' is not a valid email address"),
            ));
        }
    }
    if let Some(from) = &alerts.from {
        if !from.validate_email() {
            return Err(ContractError::config_validation(
                "alerts.from",
                format!("'{from}' is not a valid email address"),
            ));
        }
    }
    Ok(())
}

fn validate_queue(config: &RevalidatorConfig) -> Result<(), ContractError> {
    if config.queue.visibility_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "queue.visibility_timeout_secs",
            "visibility timeout must be > 0",
        ));
    }
    Ok(())
}

fn validate_diagnostics(config: &RevalidatorConfig) -> Result<(), ContractError> {
    let diagnostics = &config.diagnostics;
    if let Some(endpoint) = &diagnostics.endpoint {
        validate_http_url("diagnostics.endpoint", endpoint)?;
    }
    let mut seen = HashSet::new();
    for (idx, check) in diagnostics.checks.iter().enumerate() {
        if check.label.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("diagnostics.checks[{idx}].label"),
                "check label cannot be empty",
            ));
        }
        if !seen.insert(check.label.as_str()) {
            return Err(ContractError::config_validation(
                format!("diagnostics.checks[label={}]", check.label),
                "duplicate check label",
            ));
        }
        if check.query.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("diagnostics.checks[{}].query", check.label),
                "check query cannot be empty",
            ));
        }
    }
    Ok(())
}
