//! Mode state machine with synchronous, re-entrancy-safe notification.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::MODE_TARGET;
use crate::mode::Mode;
use crate::registry::{ModeRegistry, ModeRegistryEntry};
use crate::transitions::ModeTransitionTable;

/// A committed move between two modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    /// Mode that was current before the change.
    pub from: Mode,
    /// Newly committed mode.
    pub to: Mode,
}

/// Receives committed mode changes.
pub trait ModeObserver {
    /// Called once for every committed transition, in subscription order.
    fn on_mode_changed(&self, change: ModeChange);
}

impl<F> ModeObserver for F
where
    F: Fn(ModeChange),
{
    fn on_mode_changed(&self, change: ModeChange) {
        self(change);
    }
}

/// Handle returned by [`ModeManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Reasons a requested transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The requested mode is already current.
    #[error("mode {mode} is already active")]
    SameMode {
        /// Current mode.
        mode: Mode,
    },
    /// The transition table does not list the target for the current mode.
    #[error("cannot transition from {from} to {to}")]
    NotPermitted {
        /// Current mode.
        from: Mode,
        /// Requested mode.
        to: Mode,
    },
    /// The mode registry is populated but does not describe the target.
    #[error("mode {mode} is not registered")]
    Unregistered {
        /// Requested mode.
        mode: Mode,
    },
}

/// Result of a successful [`ModeManager::set_mode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was committed and subscribers were notified.
    Committed(ModeChange),
    /// The request arrived during notification and was queued.
    Deferred {
        /// Mode that will be validated once the current fan-out completes.
        target: Mode,
    },
}

struct Subscriber {
    id: SubscriptionId,
    observer: Rc<dyn ModeObserver>,
}

/// Owns the current mode and arbitrates transitions.
///
/// All methods take `&self` so observers holding an `Rc<ModeManager>` can
/// request further transitions from inside a notification. Such requests
/// are queued and applied in order after the current fan-out, each one
/// validated against the mode current at that point.
pub struct ModeManager {
    registry: ModeRegistry,
    transitions: ModeTransitionTable,
    current: Cell<Mode>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_subscription: Cell<u64>,
    dispatching: Cell<bool>,
    pending: RefCell<VecDeque<Mode>>,
}

impl Default for ModeManager {
    fn default() -> Self {
        Self::new(ModeRegistry::default(), ModeTransitionTable::default())
    }
}

impl std::fmt::Debug for ModeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeManager")
            .field("current", &self.current.get())
            .field("subscribers", &self.subscribers.borrow().len())
            .field("dispatching", &self.dispatching.get())
            .field("pending", &self.pending.borrow())
            .finish_non_exhaustive()
    }
}

impl ModeManager {
    /// Creates a manager in [`Mode::None`].
    #[must_use]
    pub fn new(registry: ModeRegistry, transitions: ModeTransitionTable) -> Self {
        Self {
            registry,
            transitions,
            current: Cell::new(Mode::None),
            subscribers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
            dispatching: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// Mode most recently committed.
    #[must_use]
    pub const fn current_mode(&self) -> Mode {
        self.current.get()
    }

    /// Registry entry for the current mode, when one exists.
    #[must_use]
    pub fn current_entry(&self) -> Option<&ModeRegistryEntry> {
        self.registry.find(self.current.get())
    }

    /// Mode registry consulted for transitions.
    #[must_use]
    pub const fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    /// Transition table consulted for transitions.
    #[must_use]
    pub const fn transitions(&self) -> &ModeTransitionTable {
        &self.transitions
    }

    /// Returns `true` while subscribers are being notified.
    #[must_use]
    pub const fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Returns `true` when the table permits moving from the current mode to
    /// `target`.
    #[must_use]
    pub fn can_transition(&self, target: Mode) -> bool {
        self.transitions.allows(self.current.get(), target)
    }

    /// Requests a move to `target`.
    ///
    /// Outside a notification the request is validated and committed
    /// immediately, followed by any requests queued by subscribers. During a
    /// notification the request is queued and [`TransitionOutcome::Deferred`]
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the transition is refused. The
    /// current mode is unchanged and no subscriber is notified.
    pub fn set_mode(&self, target: Mode) -> Result<TransitionOutcome, TransitionError> {
        if self.dispatching.get() {
            debug!(
                target: MODE_TARGET,
                event = "transition_deferred",
                to = %target,
                "mode change requested during notification; queued"
            );
            self.pending.borrow_mut().push_back(target);
            return Ok(TransitionOutcome::Deferred { target });
        }

        let change = self.commit(target)?;
        self.drain_pending();
        Ok(TransitionOutcome::Committed(change))
    }

    /// Registers `observer` for future transitions.
    pub fn subscribe(&self, observer: Rc<dyn ModeObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber { id, observer });
        id
    }

    /// Removes a subscription, returning whether it existed.
    ///
    /// A subscriber removed during a notification still receives the change
    /// being delivered but none after it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        subscribers.len() != before
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn validate(&self, target: Mode) -> Result<(), TransitionError> {
        let from = self.current.get();
        if from == target {
            return Err(TransitionError::SameMode { mode: target });
        }
        if !self.transitions.allows(from, target) {
            return Err(TransitionError::NotPermitted { from, to: target });
        }
        if !self.registry.is_empty() && !self.registry.contains(target) {
            return Err(TransitionError::Unregistered { mode: target });
        }
        Ok(())
    }

    fn commit(&self, target: Mode) -> Result<ModeChange, TransitionError> {
        if let Err(error) = self.validate(target) {
            warn!(
                target: MODE_TARGET,
                event = "transition_rejected",
                from = %self.current.get(),
                to = %target,
                error = %error,
                "mode transition rejected"
            );
            return Err(error);
        }

        let change = ModeChange {
            from: self.current.replace(target),
            to: target,
        };
        info!(
            target: MODE_TARGET,
            event = "mode_changed",
            from = %change.from,
            to = %change.to,
            "mode set"
        );
        self.notify(change);
        Ok(change)
    }

    fn notify(&self, change: ModeChange) {
        let observers: Vec<Rc<dyn ModeObserver>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|subscriber| Rc::clone(&subscriber.observer))
            .collect();

        let _guard = DispatchGuard::enter(&self.dispatching);
        for observer in observers {
            observer.on_mode_changed(change);
        }
    }

    fn drain_pending(&self) {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(target) = next else {
                break;
            };
            if let Err(error) = self.commit(target) {
                debug!(
                    target: MODE_TARGET,
                    event = "queued_transition_dropped",
                    to = %target,
                    error = %error,
                    "queued mode change discarded"
                );
            }
        }
    }
}

struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
