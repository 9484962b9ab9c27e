//! Tool plugin registry and lifecycle management.
//!
//! Tools are described by [`ToolDescriptor`]s held in a [`ToolRegistry`] and
//! built by the [`ToolFactory`] a [`ToolCatalog`] maps their class to. The
//! [`PluginManager`] owns the resulting instances, activates and
//! deactivates them on request, and deactivates tools that cannot stay
//! active when the mode changes.
//!
//! Two reference tool variants are provided: [`PanelTool`], which presents
//! a widget on a UI layer, and [`BatchProcessor`], which runs a
//! [`BatchJob`] one batch per scheduler tick. [`validate_descriptor`]
//! checks descriptors statically and [`Console`] exposes the whole
//! framework through text commands.

pub mod batch;
pub mod catalog;
pub mod console;
pub mod contract;
pub mod error;
pub mod events;
pub mod manager;
pub mod metadata;
pub mod panel;
pub mod registry;
pub mod validator;

pub use batch::{BatchJob, BatchProcessor, ProcessingObserver};
pub use catalog::{ToolCatalog, ToolContext, ToolFactory};
pub use console::{CommandError, Console, ConsoleCommand};
pub use contract::{SharedTool, Tool, ToolCore};
pub use error::{PluginError, ToolError};
pub use events::{EventLog, ToolEvent, ToolEventObserver};
pub use manager::PluginManager;
pub use metadata::{DEFAULT_PRIORITY, ToolCategory, ToolDescriptor, ToolMetadata, ToolScope};
pub use panel::PanelTool;
pub use registry::ToolRegistry;
pub use validator::{Severity, ValidationIssue, ValidationReport, validate_descriptor};

/// Tracing target for plugin framework events.
pub const PLUGIN_TARGET: &str = "stagehand::plugins";
