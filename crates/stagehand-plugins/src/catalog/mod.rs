//! Class name to factory mapping.
//!
//! A [`ToolCatalog`] resolves the `class` of a [`ToolDescriptor`] to a
//! [`ToolFactory`]. Factories receive a [`ToolContext`] carrying the host
//! collaborators a tool may need.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use stagehand_config::DEFAULT_BATCH_INTERVAL_MS;
use stagehand_modes::ModeManager;
use stagehand_services::{Scheduler, UiLayerService};

use crate::contract::SharedTool;
use crate::error::ToolError;
use crate::metadata::ToolDescriptor;

/// Collaborators handed to tool factories.
#[derive(Clone)]
pub struct ToolContext {
    modes: Rc<ModeManager>,
    ui: Rc<dyn UiLayerService>,
    scheduler: Rc<dyn Scheduler>,
    batch_interval: Duration,
}

impl ToolContext {
    /// Creates a context using the default batch interval.
    #[must_use]
    pub fn new(
        modes: Rc<ModeManager>,
        ui: Rc<dyn UiLayerService>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            modes,
            ui,
            scheduler,
            batch_interval: Duration::from_millis(DEFAULT_BATCH_INTERVAL_MS),
        }
    }

    /// Overrides the interval used by batch processors.
    #[must_use]
    pub const fn with_batch_interval(mut self, interval: Duration) -> Self {
        self.batch_interval = interval;
        self
    }

    /// Mode manager driving the session.
    #[must_use]
    pub const fn modes(&self) -> &Rc<ModeManager> {
        &self.modes
    }

    /// UI layer service.
    #[must_use]
    pub fn ui(&self) -> Rc<dyn UiLayerService> {
        Rc::clone(&self.ui)
    }

    /// Timer service.
    #[must_use]
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.scheduler)
    }

    /// Tick interval for batch processors.
    #[must_use]
    pub const fn batch_interval(&self) -> Duration {
        self.batch_interval
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("mode", &self.modes.current_mode())
            .field("batch_interval", &self.batch_interval)
            .finish_non_exhaustive()
    }
}

/// Builds tool instances for one class.
pub trait ToolFactory {
    /// Creates a fresh, uninitialised instance for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the instance cannot be built.
    fn create(
        &self,
        context: &ToolContext,
        descriptor: &ToolDescriptor,
    ) -> Result<SharedTool, ToolError>;
}

impl<F> ToolFactory for F
where
    F: Fn(&ToolContext, &ToolDescriptor) -> Result<SharedTool, ToolError>,
{
    fn create(
        &self,
        context: &ToolContext,
        descriptor: &ToolDescriptor,
    ) -> Result<SharedTool, ToolError> {
        self(context, descriptor)
    }
}

/// Factories keyed by class name.
#[derive(Default, Clone)]
pub struct ToolCatalog {
    factories: BTreeMap<String, Rc<dyn ToolFactory>>,
}

impl ToolCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `class`, replacing any earlier factory.
    pub fn register(&mut self, class: impl Into<String>, factory: Rc<dyn ToolFactory>) {
        self.factories.insert(class.into(), factory);
    }

    /// Builder form of [`ToolCatalog::register`].
    #[must_use]
    pub fn with(mut self, class: impl Into<String>, factory: Rc<dyn ToolFactory>) -> Self {
        self.register(class, factory);
        self
    }

    /// Returns `true` when a factory exists for `class`.
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Factory registered for `class`.
    #[must_use]
    pub fn factory(&self, class: &str) -> Option<Rc<dyn ToolFactory>> {
        self.factories.get(class).map(Rc::clone)
    }

    /// Catalogued class names in sorted order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
