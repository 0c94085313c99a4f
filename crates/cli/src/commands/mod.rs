//! Command implementations.

mod check;
mod frontends;
mod logs;
mod ping;
mod revalidate;
mod stats;
mod validate;
mod worker;

pub use check::run_check;
pub use frontends::run_frontends;
pub use logs::run_logs;
pub use ping::run_test;
pub use revalidate::run_revalidate;
pub use stats::run_stats;
pub use validate::run_validate;
pub use worker::run_worker;

use dispatcher::{Dispatched, Enqueued};

use crate::error::CliError;

/// Print immediate dispatch results; fails when any dispatch was not ok
pub(crate) fn report_dispatched(results: &[Dispatched]) -> anyhow::Result<()> {
    for d in results {
        let mark = if d.result.ok { "✓" } else { "✗" };
        match &d.result.error {
            Some(error) => println!(
                "{} {} {} HTTP {} {}ms {}",
                mark, d.frontend, d.scope, d.result.status, d.result.latency_ms, error
            ),
            None => println!(
                "{} {} {} HTTP {} {}ms",
                mark, d.frontend, d.scope, d.result.status, d.result.latency_ms
            ),
        }
    }

    let failed = results.iter().filter(|d| !d.result.ok).count();
    if failed > 0 {
        return Err(CliError::DispatchFailed {
            failed,
            total: results.len(),
        }
        .into());
    }
    Ok(())
}

pub(crate) fn report_enqueued(items: &[Enqueued]) {
    for e in items {
        println!("⏳ {} {} queued as #{}", e.frontend, e.scope, e.queue_id);
    }
}
