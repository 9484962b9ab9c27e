//! Cursor and input routing derived from the current mode.

use std::rc::Rc;

use stagehand_modes::{Mode, ModeChange, ModeObserver};
use strum::Display;
use tracing::debug;

use crate::SERVICES_TARGET;

/// Where input events are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InputMode {
    /// Gameplay only; UI ignores input.
    GameOnly,
    /// UI only; gameplay ignores input.
    UiOnly,
    /// Both receive input.
    GameAndUi,
}

/// Input routing and cursor visibility applied together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputPolicy {
    /// Input routing.
    pub mode: InputMode,
    /// Whether the pointer is visible.
    pub show_cursor: bool,
}

impl InputPolicy {
    /// Policy for `mode`, or `None` when the mode does not prescribe one.
    #[must_use]
    pub const fn for_mode(mode: Mode) -> Option<Self> {
        let (input, show_cursor) = match mode {
            Mode::MainMenu => (InputMode::UiOnly, true),
            Mode::InGame | Mode::Runtime => (InputMode::GameOnly, false),
            Mode::Editor => (InputMode::GameAndUi, true),
            Mode::None => return None,
        };
        Some(Self {
            mode: input,
            show_cursor,
        })
    }
}

/// Host surface that applies input policies, typically a player controller.
pub trait InputSurface {
    /// Applies `policy` immediately.
    fn apply_input_policy(&self, policy: InputPolicy);
}

/// Mode observer forwarding the matching [`InputPolicy`] to a surface.
pub struct InputModeController {
    surface: Rc<dyn InputSurface>,
}

impl InputModeController {
    /// Creates a controller for `surface`.
    #[must_use]
    pub fn new(surface: Rc<dyn InputSurface>) -> Self {
        Self { surface }
    }
}

impl ModeObserver for InputModeController {
    fn on_mode_changed(&self, change: ModeChange) {
        let Some(policy) = InputPolicy::for_mode(change.to) else {
            return;
        };
        debug!(
            target: SERVICES_TARGET,
            event = "input_policy",
            mode = %change.to,
            input = %policy.mode,
            show_cursor = policy.show_cursor,
            "input policy applied"
        );
        self.surface.apply_input_policy(policy);
    }
}
