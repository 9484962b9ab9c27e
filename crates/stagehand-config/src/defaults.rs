use crate::logging::LogFormat;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default interval between batch-processing ticks, in milliseconds.
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 100;

/// Default number of tool events retained for diagnostics.
pub const DEFAULT_EVENT_HISTORY: usize = 64;

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
