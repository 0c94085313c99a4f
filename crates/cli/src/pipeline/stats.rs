//! Worker run reporting.

use dispatcher::DrainReport;

/// Items claimed per second over the run
pub fn throughput(report: &DrainReport) -> f64 {
    let secs = report.elapsed.as_secs_f64();
    if secs > 0.0 {
        report.metrics.claimed as f64 / secs
    } else {
        0.0
    }
}

/// Print detailed summary of a drain run
pub fn print_drain_report(report: &DrainReport) {
    let m = &report.metrics;

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Retry Worker Statistics                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📊 Overview");
    println!("   ├─ Duration: {:.2}s", report.elapsed.as_secs_f64());
    println!("   ├─ Items claimed: {}", m.claimed);
    println!("   ├─ Items/s: {:.2}", throughput(report));
    println!("   └─ Still queued: {}", report.remaining);

    println!("\n📬 Outcomes");
    println!("   ├─ Dispatched OK: {}", m.dispatched);
    println!("   ├─ Dispatched with failure: {}", m.failed);
    println!("   ├─ Dropped: {}", m.dropped);
    println!("   └─ Left for redelivery: {}", m.errors);

    let summary = &report.summary;
    println!("\n📈 Dispatches");
    println!(
        "   ├─ Succeeded: {} of {} ({:.1}%)",
        summary.succeeded, summary.total, summary.success_rate
    );
    println!("   ├─ HTTP errors: {}", summary.http_errors);
    println!("   ├─ Transport errors: {}", summary.transport_errors);
    println!("   └─ Latency (ms): {}", summary.latency_ms);

    if !summary.failures_by_frontend.is_empty() {
        println!("\n⚠️  Failures by Frontend");
        let last = summary.failures_by_frontend.len() - 1;
        for (i, (frontend, count)) in summary.failures_by_frontend.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("   {} {}: {}", prefix, frontend, count);
        }
    }

    println!();
}
