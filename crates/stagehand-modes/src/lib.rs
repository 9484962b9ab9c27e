//! Application modes and the state machine that moves between them.
//!
//! A [`ModeManager`] owns the current [`Mode`], validates each requested
//! transition against a [`ModeTransitionTable`] and an optional
//! [`ModeRegistry`], then notifies subscribers synchronously in the order
//! they subscribed. Transitions requested by a subscriber while a
//! notification is being delivered are queued and applied once the current
//! fan-out finishes.
//!
//! [`AppStateController`] maps coarse host states onto modes.

mod app_state;
mod manager;
mod mode;
mod registry;
mod transitions;

pub use app_state::{AppState, AppStateController, AppStateObserver};
pub use manager::{
    ModeChange, ModeManager, ModeObserver, SubscriptionId, TransitionError, TransitionOutcome,
};
pub use mode::{Mode, ModeParseError};
pub use registry::{ModeRegistry, ModeRegistryEntry};
pub use transitions::ModeTransitionTable;

/// Tracing target for mode-related events.
pub const MODE_TARGET: &str = "stagehand::modes";
