//! # Revalidator CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Tag / path / entity revalidation, immediate or queued
//! - Test pings, event-log listing and stats
//! - The retry-queue worker and diagnostic checks
//! - Configuration validation

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::Layer;

use cli::{Cli, Commands};
use commands::{
    run_check, run_frontends, run_logs, run_revalidate, run_stats, run_test, run_validate,
    run_worker,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Revalidator starting");

    let config = cli.config.as_path();
    let result = match &cli.command {
        Commands::Revalidate(command) => run_revalidate(config, command).await,
        Commands::Test(args) => run_test(config, args).await,
        Commands::Logs(args) => run_logs(config, args),
        Commands::Stats(args) => run_stats(config, args),
        Commands::Frontends(args) => run_frontends(config, args),
        Commands::Worker(args) => run_worker(config, args).await,
        Commands::Check(args) => run_check(config, args).await,
        Commands::Validate(args) => run_validate(config, args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options; logs go to stderr
fn init_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let fmt_layer = match cli.log_format {
        cli::LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        cli::LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        cli::LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
