//! `frontends` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use contracts::{
    domains, AttemptFilter, AttemptStats, DispatchAttempt, EventStore, FrontendTarget,
    DEFAULT_STATS_SAMPLE,
};

use super::stats::format_stats;
use crate::cli::FrontendsArgs;
use crate::pipeline::Pipeline;

/// One frontend as shown to operators; never carries the secret itself
#[derive(Serialize)]
struct FrontendInfo {
    id: String,
    label: String,
    revalidate_webhook: Option<String>,
    path_revalidate_webhook: Option<String>,
    secret_configured: bool,
    health_url: Option<String>,
    ci_url: Option<String>,
    test_stats: AttemptStats,
    recent: Vec<DispatchAttempt>,
}

/// Execute the `frontends` command
pub fn run_frontends(config: &Path, args: &FrontendsArgs) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let frontends = pipeline.service.registry().list_frontends();

    let mut infos = Vec::with_capacity(frontends.len());
    for target in frontends.values() {
        let test_stats = pipeline
            .store
            .stats(&target.id, domains::TEST, None, DEFAULT_STATS_SAMPLE)
            .context("Failed to compute stats")?;
        let filter = AttemptFilter {
            frontend: Some(target.id.clone()),
            ..Default::default()
        };
        let recent = pipeline
            .store
            .last_attempts(&filter, args.recent)
            .context("Failed to read event log")?;
        infos.push(describe(target, test_stats, recent));
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&infos).context("Failed to serialize frontends")?
        );
    } else {
        print_frontends(&infos);
    }
    Ok(())
}

fn describe(
    target: &FrontendTarget,
    test_stats: AttemptStats,
    recent: Vec<DispatchAttempt>,
) -> FrontendInfo {
    let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
    FrontendInfo {
        id: target.id.clone(),
        label: target.display_label().to_string(),
        revalidate_webhook: target.tag_endpoint().map(str::to_string),
        path_revalidate_webhook: target.path_endpoint().map(str::to_string),
        secret_configured: !target.secret.is_empty(),
        health_url: non_empty(target.health_url.as_str()),
        ci_url: non_empty(target.ci_url.as_str()),
        test_stats,
        recent,
    }
}

fn print_frontends(infos: &[FrontendInfo]) {
    println!("🌐 Frontends ({})", infos.len());
    for (i, fe) in infos.iter().enumerate() {
        let is_last = i == infos.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, fe.id, fe.label);
        println!(
            "   {}  ├─ Tag webhook: {}",
            child,
            fe.revalidate_webhook.as_deref().unwrap_or("(none)")
        );
        println!(
            "   {}  ├─ Path webhook: {}",
            child,
            fe.path_revalidate_webhook.as_deref().unwrap_or("(none)")
        );
        println!(
            "   {}  ├─ Secret: {}",
            child,
            if fe.secret_configured { "configured" } else { "none" }
        );
        if let Some(url) = &fe.health_url {
            println!("   {}  ├─ Health: {}", child, url);
        }
        if let Some(url) = &fe.ci_url {
            println!("   {}  ├─ CI: {}", child, url);
        }
        println!(
            "   {}  └─ {}",
            child,
            format_stats(&fe.id, domains::TEST, &fe.test_stats)
        );
        for attempt in &fe.recent {
            println!("   {}       {}", child, attempt.summary_line());
        }
    }
}
