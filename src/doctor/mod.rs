//! Doctor module - diagnostics and self-test
//!
//! Checks configuration, the knowledge store, model credentials and the
//! fixed answers the assistant must always give.

pub mod checks;
pub mod report;

use anyhow::Result;

use crate::agent::Assistant;
use crate::config::Config;
use report::DiagnosticReport;

/// Run diagnostics and print the report; returns whether all checks passed
pub async fn run_diagnostics(assistant: &Assistant, config: &Config) -> Result<bool> {
    println!("\n{} - diagnostics", crate::info());
    println!("─────────────────────────\n");

    let mut report = DiagnosticReport::new(crate::VERSION);

    println!("Running health checks...");
    for result in checks::run_all_checks(assistant, config).await {
        let status = if result.passed { "✓" } else { "✗" };
        println!("  {} {}: {}", status, result.name, result.message);
        report.add_check(result);
    }

    report.finalize();
    println!("{}", report);

    if !report.healthy {
        println!("Recommendations:");
        for check in report.checks.iter().filter(|c| !c.passed) {
            if let Some(ref fix) = check.fix {
                println!("  • {} - {}", check.name, fix);
            }
        }
    }

    Ok(report.healthy)
}
