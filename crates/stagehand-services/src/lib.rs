//! Collaborator interfaces the lifecycle core calls into.
//!
//! Each host service is modelled as a trait so the core can be driven by
//! real engines or by the in-memory implementations provided here:
//!
//! - [`UiLayerService`] pushes and pops widgets on named layers;
//!   [`UiLayerStack`] keeps one widget per layer.
//! - [`SceneStreamer`] loads and unloads levels; [`SceneManager`] sequences
//!   scene switches so a new scene loads only after the old one unloads.
//! - [`InputSurface`] receives cursor and input-routing policies;
//!   [`InputModeController`] derives them from mode changes.
//! - [`Scheduler`] runs periodic callbacks; [`ManualScheduler`] advances
//!   virtual time on request.

mod input;
mod scene;
mod scheduler;
mod ui;

pub use input::{InputMode, InputModeController, InputPolicy, InputSurface};
pub use scene::{
    SceneEntry, SceneError, SceneEvent, SceneManager, SceneObserver, SceneRegistry, SceneStreamer,
    UnloadStatus,
};
pub use scheduler::{ManualScheduler, Scheduler, TimerCallback, TimerId};
pub use ui::{UiEntry, UiLayer, UiLayerService, UiLayerStack, UiRegistry, WidgetHandle};

/// Tracing target for collaborator services.
pub const SERVICES_TARGET: &str = "stagehand::services";
