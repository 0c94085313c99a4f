//! `worker` command implementation.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::cli::WorkerArgs;
use crate::pipeline::{print_drain_report, Pipeline};

/// Execute the `worker` command
pub async fn run_worker(config: &Path, args: &WorkerArgs) -> Result<()> {
    let pipeline = Pipeline::load(config)?;

    if args.metrics_port > 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let max_runtime = args
        .max_runtime
        .map(Duration::from_secs)
        .unwrap_or_else(|| pipeline.config.queue.max_runtime());
    info!(
        max_items = ?args.max_items,
        max_runtime_secs = max_runtime.as_secs(),
        "Starting retry worker"
    );

    let worker = pipeline.worker();
    let shutdown_signal = setup_shutdown_signal();

    tokio::select! {
        result = worker.run_until_idle(args.max_items, max_runtime) => {
            let report = result.context("Retry worker failed")?;
            info!(
                claimed = report.metrics.claimed,
                dispatched = report.metrics.dispatched,
                failed = report.metrics.failed,
                remaining = report.remaining,
                "Retry worker finished"
            );
            print_drain_report(&report);
        }
        _ = shutdown_signal => {
            let m = worker.metrics().snapshot();
            warn!(claimed = m.claimed, "Received shutdown signal, stopping worker");
        }
    }

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
