//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{FrontendTarget, RevalidatorConfig};
use registry::FrontendRegistry;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    storage: String,
    frontend_count: usize,
    secret_store: String,
    alert_threshold: i64,
    alert_channels: usize,
    diagnostic_checks: usize,
}

/// Execute the `validate` command
pub fn run_validate(config: &Path, args: &ValidateArgs) -> Result<()> {
    info!(config = %config.display(), "Validating configuration");

    let result = validate_config(config);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    if !path.exists() {
        return invalid(config_path, format!("File not found: {}", path.display()));
    }

    let config = match config_loader::ConfigLoader::load_from_path(path) {
        Ok(config) => config,
        Err(e) => return invalid(config_path, e.to_string()),
    };
    let registry = match FrontendRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => return invalid(config_path, e.to_string()),
    };

    let frontends: Vec<FrontendTarget> = registry.list_frontends().into_values().collect();
    let warnings = collect_warnings(&config, &frontends);
    let alert_channels =
        usize::from(config.alerts.slack_webhook().is_some()) + config.alerts.emails.len();

    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            storage: config.storage.path.clone(),
            frontend_count: frontends.len(),
            secret_store: registry.secret_store_name().to_string(),
            alert_threshold: config.alerts.threshold,
            alert_channels,
            diagnostic_checks: config.diagnostics.checks.len(),
        }),
    }
}

fn invalid(config_path: String, error: String) -> ValidationResult {
    ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: None,
        summary: None,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RevalidatorConfig, frontends: &[FrontendTarget]) -> Vec<String> {
    let mut warnings = Vec::new();

    if frontends.iter().all(|f| f.tag_endpoint().is_none()) {
        warnings.push("No revalidate webhook configured - tag revalidation will fail".to_string());
    }

    for fe in frontends {
        if fe.tag_endpoint().is_some() && fe.secret.is_empty() {
            warnings.push(format!("Frontend '{}' has no shared secret", fe.id));
        }
    }

    let has_channel = config.alerts.slack_webhook().is_some() || !config.alerts.emails.is_empty();
    if config.alerts.threshold > 0 && !has_channel {
        warnings.push("alerts.threshold is set but no alert channel is configured".to_string());
    }
    if config.alerts.threshold <= 0 && has_channel {
        warnings.push("alerts.threshold <= 0 - alerting is disabled".to_string());
    }

    if !config.diagnostics.checks.is_empty() && config.diagnostics.endpoint.is_none() {
        warnings.push("diagnostics.checks configured without diagnostics.endpoint".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Storage: {}", summary.storage);
            println!("  Frontends: {}", summary.frontend_count);
            println!("  Secret store: {}", summary.secret_store);
            println!("  Alert threshold: {}", summary.alert_threshold);
            println!("  Alert channels: {}", summary.alert_channels);
            println!("  Diagnostic checks: {}", summary.diagnostic_checks);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
