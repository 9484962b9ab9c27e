//! Shared configuration for the Stagehand runtime.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional file supplied through `--config-path` or `STAGEHAND_CONFIG_PATH`,
//! then `STAGEHAND_*` environment variables, then command-line flags. Every
//! field is optional so that a missing layer never prevents start-up; the
//! accessors on [`Config`] resolve the documented defaults.
//!
//! The crate also owns the data-asset loader used at start-up to read the
//! mode registry, transition table, tool registry, scene registry and UI
//! registry. Missing or malformed assets degrade to empty values rather
//! than failing the host.

mod assets;
mod defaults;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use assets::{AssetError, AssetKind, AssetPaths, load_asset_or_default, try_load_asset};
pub use defaults::{
    DEFAULT_BATCH_INTERVAL_MS, DEFAULT_EVENT_HISTORY, DEFAULT_LOG_FILTER, default_log_filter,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by the library crates and the binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "STAGEHAND")]
pub struct Config {
    /// `tracing` filter expression such as `info` or `stagehand=debug`.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Output format for log records.
    #[serde(default)]
    pub log_format: Option<LogFormat>,
    /// Directory holding the JSON data assets read at start-up.
    #[serde(default)]
    pub assets_dir: Option<Utf8PathBuf>,
    /// Tick interval, in milliseconds, used by batch-processing tools.
    #[serde(default)]
    pub batch_interval_ms: Option<u64>,
    /// Number of tool events retained for diagnostics.
    #[serde(default)]
    pub event_history: Option<usize>,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated `ortho_config` error when a layer is malformed.
    pub fn load_from_process() -> Result<Self, Arc<OrthoError>> {
        Self::load()
    }

    /// Filter expression handed to the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Selected log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Directory holding the data assets, when configured.
    #[must_use]
    pub fn assets_dir(&self) -> Option<&Utf8Path> {
        self.assets_dir.as_deref()
    }

    /// Asset file locations derived from [`Config::assets_dir`].
    #[must_use]
    pub fn asset_paths(&self) -> Option<AssetPaths> {
        self.assets_dir().map(AssetPaths::new)
    }

    /// Interval between batch-processing ticks.
    #[must_use]
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms.unwrap_or(DEFAULT_BATCH_INTERVAL_MS))
    }

    /// Capacity of the tool event history.
    #[must_use]
    pub fn event_history(&self) -> usize {
        self.event_history.unwrap_or(DEFAULT_EVENT_HISTORY)
    }
}
