//! Structured health reporting for the runtime lifecycle.

use std::rc::Rc;

use stagehand_config::Config;
use stagehand_plugins::ValidationReport;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = "stagehand::health";

/// Observer surfacing lifecycle events to telemetry sinks.
pub trait HealthReporter {
    /// Invoked before the runtime is assembled.
    fn bootstrap_starting(&self);

    /// Invoked once the runtime is ready with `tools` registered tools.
    fn bootstrap_succeeded(&self, config: &Config, tools: usize);

    /// Invoked when the runtime cannot be assembled.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked for each registered tool whose descriptor has findings.
    fn tool_findings(&self, report: &ValidationReport);

    /// Invoked when the console session ends.
    fn session_finished(&self, executed: usize, failed: usize);
}

impl<T> HealthReporter for Rc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config, tools: usize) {
        (**self).bootstrap_succeeded(config, tools);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn tool_findings(&self, report: &ValidationReport) {
        (**self).tool_findings(report);
    }

    fn session_finished(&self, executed: usize, failed: usize) {
        (**self).session_finished(executed, failed);
    }
}

/// Reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "assembling runtime"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config, tools: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            tools,
            assets_dir = config.assets_dir().map(ToString::to_string),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            batch_interval_ms = config.batch_interval().as_millis(),
            "runtime ready"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "runtime bootstrap failed"
        );
    }

    fn tool_findings(&self, report: &ValidationReport) {
        for issue in report.issues() {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "tool_finding",
                tool = report.tool_id(),
                severity = %issue.severity,
                category = issue.category,
                message = %issue.message
            );
        }
    }

    fn session_finished(&self, executed: usize, failed: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_finished",
            executed,
            failed,
            "console session ended"
        );
    }
}
