//! Operator-facing text: banners, per-service status lines, summaries.
//!
//! Everything here is pure string building; `main` decides where it goes.

use std::fmt::Write;

use crate::error::{ShutdownFailure, StartupFailure, StartupStage};
use crate::registry::Registry;
use crate::supervisor::{Ready, TeardownReport};

pub const RULE_WIDTH: usize = 50;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
/// Conventional exit status after SIGINT.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Exit status when `start_all` gave up.
pub fn startup_exit_code(failure: &StartupFailure) -> u8 {
    match failure.stage {
        StartupStage::Interrupted => EXIT_INTERRUPTED,
        StartupStage::Launch | StartupStage::Health => EXIT_FAILURE,
    }
}

/// Exit status once `supervise` has torn everything down.
pub fn shutdown_exit_code(result: &Result<TeardownReport, ShutdownFailure>) -> u8 {
    match result {
        Ok(_) => EXIT_OK,
        Err(_) => EXIT_FAILURE,
    }
}

pub fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

/// Service URLs and the stop hint, shown once everything is healthy.
pub fn ready_summary(ready: &Ready) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "All {} services are running.", ready.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "Service URLs:");
    for service in ready.services() {
        let _ = writeln!(out, "  {}: {}", service.name(), service.spec().display_url());
    }
    let _ = writeln!(out);
    let _ = write!(out, "Press Ctrl+C to stop services");
    out
}

/// What failed, why, recent output, and what was stopped.
pub fn startup_failure_summary(failure: &StartupFailure) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "✗ {} ({} stage): {}", failure.service, failure.stage, failure.cause);
    if !failure.recent_output.is_empty() {
        let _ = writeln!(out, "  Last output from {}:", failure.service);
        for line in &failure.recent_output {
            let _ = writeln!(out, "    {line}");
        }
    }
    out.push_str(&teardown_summary(&failure.teardown));
    out
}

pub fn shutdown_failure_summary(failure: &ShutdownFailure) -> String {
    let mut out = teardown_summary(&failure.teardown);
    let _ = write!(out, "\n{failure}; processes may still be running");
    out
}

/// One line per stopped service in stop order, then any failures.
pub fn teardown_summary(report: &TeardownReport) -> String {
    let mut out = String::new();
    if report.stopped.is_empty() && report.failures.is_empty() {
        let _ = write!(out, "No services were running.");
        return out;
    }
    for stopped in &report.stopped {
        let _ = writeln!(
            out,
            "  {}: {} (was {}, up {}s)",
            stopped.name,
            stopped.outcome,
            stopped.previous_state,
            stopped.uptime.num_seconds()
        );
    }
    for failure in &report.failures {
        let _ = writeln!(out, "  ✗ {failure}");
    }
    if report.is_clean() {
        let _ = write!(out, "Stopped {} service(s).", report.stopped.len());
    } else {
        let _ = write!(out, "{} service(s) could not be stopped.", report.failures.len());
    }
    out
}

/// Registry in startup order, one service per line.
pub fn registry_table(registry: &Registry) -> String {
    let mut out = String::new();
    for (idx, spec) in registry.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}  [{}]  in {}  health {}  timeout {}s",
            idx + 1,
            spec.name,
            spec.command.join(" "),
            spec.working_directory.display(),
            spec.health_url,
            spec.timeout.as_secs()
        );
    }
    out
}
