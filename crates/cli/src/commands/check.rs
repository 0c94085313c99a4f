//! `check` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use contracts::DiagnosticCheck;
use dispatcher::CheckRecord;

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::pipeline::Pipeline;

/// Execute the `check` command
pub async fn run_check(config: &Path, args: &CheckArgs) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let checks = select_checks(&pipeline.config.diagnostics.checks, args.label.as_deref())?;
    if checks.is_empty() {
        println!("No diagnostic checks configured");
        return Ok(());
    }

    info!(count = checks.len(), "Running diagnostic checks");
    let results = pipeline
        .diagnostics()
        .run_all(&checks)
        .await
        .context("Diagnostic run failed")?;

    if args.json {
        let map: serde_json::Map<String, serde_json::Value> = results
            .iter()
            .map(|(label, record)| Ok((label.clone(), serde_json::to_value(record)?)))
            .collect::<Result<_, serde_json::Error>>()
            .context("Failed to serialize check results")?;
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (label, record) in &results {
            println!("{}", format_record(label, record));
        }
    }

    let failed = results.iter().filter(|(_, r)| !r.ok).count();
    if failed > 0 {
        return Err(CliError::ChecksFailed {
            failed,
            total: results.len(),
        }
        .into());
    }
    Ok(())
}

fn select_checks(checks: &[DiagnosticCheck], label: Option<&str>) -> Result<Vec<DiagnosticCheck>> {
    match label {
        None => Ok(checks.to_vec()),
        Some(label) => {
            let selected: Vec<_> = checks.iter().filter(|c| c.label == label).cloned().collect();
            if selected.is_empty() {
                return Err(CliError::unknown_check(label).into());
            }
            Ok(selected)
        }
    }
}

fn format_record(label: &str, record: &CheckRecord) -> String {
    if record.ok {
        format!("✓ {} HTTP {}", label, record.code)
    } else if record.code == 0 {
        format!("✗ {} {}", label, record.body)
    } else {
        format!("✗ {} HTTP {}", label, record.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks() -> Vec<DiagnosticCheck> {
        vec![
            DiagnosticCheck {
                label: "Articles".into(),
                query: "{ articles { id } }".into(),
            },
            DiagnosticCheck {
                label: "Menus".into(),
                query: "{ menus { id } }".into(),
            },
        ]
    }

    #[test]
    fn test_select_by_label() {
        let selected = select_checks(&checks(), Some("Menus")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].label, "Menus");
        assert_eq!(select_checks(&checks(), None).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_label() {
        let err = select_checks(&checks(), Some("Nope")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::UnknownCheck { .. })
        ));
    }

    #[test]
    fn test_format_record() {
        let ok = CheckRecord {
            t: 0,
            ok: true,
            code: 200,
            body: "{}".into(),
        };
        assert_eq!(format_record("Articles", &ok), "✓ Articles HTTP 200");

        let down = CheckRecord {
            t: 0,
            ok: false,
            code: 0,
            body: "connection refused".into(),
        };
        assert_eq!(format_record("Articles", &down), "✗ Articles connection refused");
    }
}
