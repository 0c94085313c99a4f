//! `test` command implementation.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::report_dispatched;
use crate::cli::TestArgs;
use crate::pipeline::Pipeline;

/// Execute the `test` command
pub async fn run_test(config: &Path, args: &TestArgs) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    info!(scope = %args.scope, "Sending test ping");

    let results = pipeline
        .service
        .test_ping(&args.target.selector(), Some(args.scope.as_str()))
        .await?;
    report_dispatched(&results)
}
