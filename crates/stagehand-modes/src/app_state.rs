//! Coarse host states and their mapping onto modes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info};

use crate::MODE_TARGET;
use crate::manager::{ModeManager, TransitionError, TransitionOutcome};
use crate::mode::Mode;

/// High-level state of the host session.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AppState {
    /// Nothing applied yet.
    #[default]
    None,
    /// Free exploration of the world.
    Explore,
    /// Running simulation.
    Simulation,
    /// Editing content.
    Edit,
    /// Loading content; no mode change.
    Loading,
    /// Session paused; no mode change.
    Paused,
}

impl AppState {
    /// Mode requested when entering this state, if any.
    #[must_use]
    pub const fn mode(self) -> Option<Mode> {
        match self {
            Self::Explore => Some(Mode::InGame),
            Self::Simulation => Some(Mode::Runtime),
            Self::Edit => Some(Mode::Editor),
            Self::None | Self::Loading | Self::Paused => None,
        }
    }
}

/// Receives application state changes.
pub trait AppStateObserver {
    /// Called after the state is updated and before the mode request.
    fn on_app_state_changed(&self, state: AppState);
}

impl<F> AppStateObserver for F
where
    F: Fn(AppState),
{
    fn on_app_state_changed(&self, state: AppState) {
        self(state);
    }
}

/// Tracks the current [`AppState`] and forwards the mapped mode.
pub struct AppStateController {
    modes: Rc<ModeManager>,
    state: Cell<AppState>,
    updating_mode: Cell<bool>,
    observers: RefCell<Vec<Rc<dyn AppStateObserver>>>,
}

impl AppStateController {
    /// Creates a controller driving `modes`.
    #[must_use]
    pub fn new(modes: Rc<ModeManager>) -> Self {
        Self {
            modes,
            state: Cell::new(AppState::None),
            updating_mode: Cell::new(false),
            observers: RefCell::new(Vec::new()),
        }
    }

    /// State most recently applied.
    #[must_use]
    pub const fn current(&self) -> AppState {
        self.state.get()
    }

    /// Registers an observer for subsequent state changes.
    pub fn subscribe(&self, observer: Rc<dyn AppStateObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Applies `state` and requests its mode.
    ///
    /// Returns `None` when the state is unchanged, has no mapped mode, or is
    /// applied recursively by an observer while a mode request from an
    /// outer call is still running. In the recursive case the state itself
    /// is still recorded.
    pub fn apply(&self, state: AppState) -> Option<Result<TransitionOutcome, TransitionError>> {
        if self.state.get() == state {
            return None;
        }
        self.state.set(state);
        info!(
            target: MODE_TARGET,
            event = "app_state_changed",
            state = %state,
            "app state changed"
        );

        let observers: Vec<_> = self.observers.borrow().iter().map(Rc::clone).collect();
        for observer in observers {
            observer.on_app_state_changed(state);
        }

        let mode = state.mode()?;
        if self.updating_mode.replace(true) {
            debug!(
                target: MODE_TARGET,
                event = "app_state_recursion",
                state = %state,
                "mode request skipped while another is in progress"
            );
            return None;
        }
        let outcome = self.modes.set_mode(mode);
        self.updating_mode.set(false);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Weak;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::{ModeChange, ModeRegistry, ModeTransitionTable};

    #[fixture]
    fn controller() -> AppStateController {
        AppStateController::new(Rc::new(ModeManager::default()))
    }

    #[rstest]
    #[case::explore(AppState::Explore, Mode::InGame)]
    #[case::simulation(AppState::Simulation, Mode::Runtime)]
    #[case::edit(AppState::Edit, Mode::Editor)]
    fn mapped_states_request_their_mode(#[case] state: AppState, #[case] expected: Mode) {
        let controller = AppStateController::new(Rc::new(ModeManager::new(
            ModeRegistry::default(),
            ModeTransitionTable::empty(),
        )));

        let outcome = controller.apply(state).expect("mode requested");

        assert_eq!(
            outcome,
            Ok(TransitionOutcome::Committed(ModeChange {
                from: Mode::None,
                to: expected,
            }))
        );
    }

    #[rstest]
    #[case::loading(AppState::Loading)]
    #[case::paused(AppState::Paused)]
    fn unmapped_states_leave_the_mode_alone(
        controller: AppStateController,
        #[case] state: AppState,
    ) {
        assert!(controller.apply(state).is_none());
        assert_eq!(controller.current(), state);
        assert_eq!(controller.modes.current_mode(), Mode::None);
    }

    #[rstest]
    fn reapplying_the_current_state_is_ignored(controller: AppStateController) {
        assert!(controller.apply(AppState::Explore).is_some());
        assert!(controller.apply(AppState::Explore).is_none());
    }

    #[test]
    fn observers_applying_states_do_not_recurse_into_the_mode_manager() {
        let modes = Rc::new(ModeManager::new(
            ModeRegistry::default(),
            ModeTransitionTable::empty(),
        ));
        let controller = Rc::new(AppStateController::new(Rc::clone(&modes)));
        let handle: Weak<AppStateController> = Rc::downgrade(&controller);
        let nested = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&nested);
        modes.subscribe(Rc::new(move |change: ModeChange| {
            if change.to == Mode::InGame {
                if let Some(controller) = handle.upgrade() {
                    sink.borrow_mut().push(controller.apply(AppState::Edit));
                }
            }
        }));

        let outcome = controller.apply(AppState::Explore);

        assert!(matches!(outcome, Some(Ok(TransitionOutcome::Committed(_)))));
        assert_eq!(*nested.borrow(), [None]);
        assert_eq!(controller.current(), AppState::Edit);
        assert_eq!(modes.current_mode(), Mode::InGame);
    }
}
