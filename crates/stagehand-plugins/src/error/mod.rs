//! Error types for the plugin framework.
//!
//! [`PluginError`] covers failures raised by the plugin manager while it
//! registers, instantiates and activates tools. [`ToolError`] is the error a
//! tool reports from its own lifecycle hooks.

use thiserror::Error;

/// Failure reported by a tool's lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// One-time setup did not complete.
    #[error("tool '{name}' failed to initialise: {message}")]
    Initialization {
        /// Display name of the tool.
        name: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// The tool could not enter its active state.
    #[error("tool '{name}' failed to activate: {message}")]
    Activation {
        /// Display name of the tool.
        name: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A unit of batch work failed.
    #[error("batch {index} failed: {message}")]
    Batch {
        /// Zero-based index of the failing batch.
        index: u32,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A factory could not build the tool instance.
    #[error("could not construct '{class}': {message}")]
    Construction {
        /// Class name the factory was asked to build.
        class: String,
        /// Human-readable description of the failure.
        message: String,
    },
}

/// Errors raised by the plugin manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// Tool identifiers must be non-empty.
    #[error("tool id must not be empty")]
    EmptyId,

    /// No descriptor is registered under this id.
    #[error("tool '{id}' is not registered")]
    UnknownTool {
        /// Requested tool id.
        id: String,
    },

    /// The descriptor references a class with no catalogued factory.
    #[error("class '{class}' for tool '{id}' does not implement the tool contract")]
    ContractViolation {
        /// Tool id being registered or instantiated.
        id: String,
        /// Class name that could not be resolved.
        class: String,
    },

    /// The descriptor is registered but disabled.
    #[error("tool '{id}' is disabled")]
    Disabled {
        /// Requested tool id.
        id: String,
    },

    /// The catalogued factory failed to build an instance.
    #[error("failed to instantiate tool '{id}': {source}")]
    Instantiation {
        /// Requested tool id.
        id: String,
        /// Error reported by the factory.
        #[source]
        source: ToolError,
    },

    /// The tool's `activate` hook failed.
    #[error("failed to activate tool '{id}': {source}")]
    Activation {
        /// Requested tool id.
        id: String,
        /// Error reported by the tool.
        #[source]
        source: ToolError,
    },

    /// The tool instance is already borrowed by its caller.
    #[error("tool '{id}' is in use")]
    ToolBusy {
        /// Requested tool id.
        id: String,
    },

    /// An operation was invoked while another manager operation was running.
    #[error("plugin manager is busy; '{operation}' was rejected")]
    Reentrant {
        /// Name of the rejected operation.
        operation: &'static str,
    },
}
