//! `logs` command implementation.

use std::path::Path;

use anyhow::{Context, Result};

use contracts::{Action, AttemptFilter, DispatchAttempt, EventStore, CSV_HEADER};

use crate::cli::LogsArgs;
use crate::pipeline::Pipeline;

/// Execute the `logs` command
pub fn run_logs(config: &Path, args: &LogsArgs) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let filter = build_filter(args)?;
    let rows = pipeline
        .store
        .last_attempts(&filter, args.limit)
        .context("Failed to read event log")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialize attempts")?
        );
    } else if args.csv {
        print!("{}", render_csv(&rows));
    } else if rows.is_empty() {
        println!("No attempts recorded");
    } else {
        for row in &rows {
            println!("{}", row.summary_line());
        }
    }
    Ok(())
}

fn build_filter(args: &LogsArgs) -> Result<AttemptFilter> {
    let action = args
        .action
        .as_deref()
        .map(str::parse::<Action>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    Ok(AttemptFilter {
        frontend: non_empty(&args.frontend),
        domain: non_empty(&args.domain),
        scope: non_empty(&args.scope),
        action,
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn render_csv(rows: &[DispatchAttempt]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.csv_record());
        out.push('\n');
    }
    out
}
