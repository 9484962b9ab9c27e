//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::bootstrap::BootstrapError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("failed to read script '{path}': {source}")]
    ReadScript {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read console input: {0}")]
    ReadInput(#[source] io::Error),
    #[error("failed to write console output: {0}")]
    WriteOutput(#[source] io::Error),
    #[error("failed to shut down tools: {0}")]
    Shutdown(#[source] stagehand_plugins::PluginError),
}
