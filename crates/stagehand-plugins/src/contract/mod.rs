//! The contract every tool implements.
//!
//! Tools are owned by the plugin manager's instance cache as [`SharedTool`]
//! handles. [`ToolCore`] carries the lifecycle bookkeeping shared by the
//! bundled tool variants.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use stagehand_modes::Mode;
use stagehand_services::WidgetHandle;
use tracing::{debug, info, warn};

use crate::PLUGIN_TARGET;
use crate::error::ToolError;
use crate::metadata::ToolMetadata;

/// Shared handle to a tool instance.
pub type SharedTool = Rc<RefCell<dyn Tool>>;

/// Lifecycle hooks and queries implemented by every tool.
pub trait Tool: Any {
    /// Performs one-time setup. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when setup fails.
    fn initialize(&mut self) -> Result<(), ToolError>;

    /// Enters the active state, initialising first when needed.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when initialisation or activation fails.
    fn activate(&mut self) -> Result<(), ToolError>;

    /// Leaves the active state.
    fn deactivate(&mut self);

    /// Releases resources, deactivating first when active.
    fn shutdown(&mut self);

    /// Descriptive metadata.
    fn metadata(&self) -> &ToolMetadata;

    /// Returns `true` while active.
    fn is_active(&self) -> bool;

    /// Returns `true` when the tool may stay active in `mode`.
    fn can_activate_in_mode(&self, mode: Mode) -> bool {
        self.metadata().supports_mode(mode)
    }

    /// Widget presenting the tool, when it has one.
    fn create_widget(&mut self) -> Option<WidgetHandle> {
        None
    }

    /// Observes a committed mode change.
    fn on_mode_changed(&mut self, _mode: Mode) {}

    /// Upcast for downcasting to the concrete variant.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete variant.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Lifecycle flags and metadata shared by tool implementations.
#[derive(Debug, Clone)]
pub struct ToolCore {
    metadata: ToolMetadata,
    initialized: bool,
    active: bool,
    mode: Mode,
}

impl ToolCore {
    /// Creates an uninitialised, inactive core.
    #[must_use]
    pub const fn new(metadata: ToolMetadata) -> Self {
        Self {
            metadata,
            initialized: false,
            active: false,
            mode: Mode::None,
        }
    }

    /// Tool metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Returns `true` once initialised.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns `true` while active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Last mode reported to the tool.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Marks the tool initialised. Returns `false` when it already was.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        info!(target: PLUGIN_TARGET, event = "tool_initialized", tool = %self.metadata.name);
        true
    }

    /// Marks the tool active. Returns `false`, with a warning, when it
    /// already was.
    ///
    /// Callers initialise first; activation of an uninitialised core is
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Activation`] when the core is not initialised.
    pub fn activate(&mut self) -> Result<bool, ToolError> {
        if !self.initialized {
            return Err(ToolError::Activation {
                name: self.metadata.name.clone(),
                message: String::from("tool is not initialised"),
            });
        }
        if self.active {
            warn!(target: PLUGIN_TARGET, event = "tool_already_active", tool = %self.metadata.name);
            return Ok(false);
        }
        self.active = true;
        info!(target: PLUGIN_TARGET, event = "tool_activated", tool = %self.metadata.name);
        Ok(true)
    }

    /// Marks the tool inactive. Returns `false` when it was not active.
    pub fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        info!(target: PLUGIN_TARGET, event = "tool_deactivated", tool = %self.metadata.name);
        true
    }

    /// Clears every flag. Returns `false` when nothing was initialised.
    pub fn shutdown(&mut self) -> bool {
        if !self.initialized {
            return false;
        }
        self.active = false;
        self.initialized = false;
        debug!(target: PLUGIN_TARGET, event = "tool_shutdown", tool = %self.metadata.name);
        true
    }

    /// Records the current mode.
    pub const fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}
