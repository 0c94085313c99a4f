//! `stats` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use contracts::{AttemptStats, EventStore};

use crate::cli::StatsArgs;
use crate::pipeline::Pipeline;

#[derive(Serialize)]
struct StatsReport<'a> {
    frontend: &'a str,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
    #[serde(flatten)]
    stats: AttemptStats,
}

/// Execute the `stats` command
pub fn run_stats(config: &Path, args: &StatsArgs) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let scope = args.scope.as_deref().filter(|s| !s.is_empty());
    let stats = pipeline
        .store
        .stats(&args.frontend, &args.domain, scope, args.sample)
        .context("Failed to compute stats")?;

    if args.json {
        let report = StatsReport {
            frontend: &args.frontend,
            domain: &args.domain,
            scope,
            stats,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize stats")?
        );
    } else {
        println!("{}", format_stats(&args.frontend, &args.domain, &stats));
    }
    Ok(())
}

/// `frontend/domain: N attempts, success X%, p95 Yms`
pub(crate) fn format_stats(frontend: &str, domain: &str, stats: &AttemptStats) -> String {
    match (stats.success_rate, stats.p95) {
        (Some(rate), Some(p95)) => format!(
            "{frontend}/{domain}: {} attempts, success {rate:.1}%, p95 {p95}ms",
            stats.count
        ),
        _ => format!("{frontend}/{domain}: no attempts"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stats() {
        let stats = AttemptStats {
            count: 4,
            success_rate: Some(75.0),
            p95: Some(120),
        };
        assert_eq!(
            format_stats("site_a", "test", &stats),
            "site_a/test: 4 attempts, success 75.0%, p95 120ms"
        );
    }

    #[test]
    fn test_format_empty_stats() {
        let stats = AttemptStats {
            count: 0,
            success_rate: None,
            p95: None,
        };
        assert_eq!(format_stats("default", "test", &stats), "default/test: no attempts");
    }
}
