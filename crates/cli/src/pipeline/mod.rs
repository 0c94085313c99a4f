//! Pipeline wiring and run reporting.

mod orchestrator;
mod stats;

pub use orchestrator::Pipeline;
pub use stats::print_drain_report;
