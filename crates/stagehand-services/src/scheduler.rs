//! Periodic timers driven by the host's update loop.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

use tracing::trace;

use crate::SERVICES_TARGET;

/// Identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Callback invoked each time a timer fires.
pub type TimerCallback = Box<dyn FnMut()>;

/// Single-threaded timer service.
///
/// Callbacks may schedule, pause or cancel timers, including their own.
pub trait Scheduler {
    /// Schedules `callback` to run every `interval`, first after one interval.
    fn schedule(&self, interval: Duration, callback: TimerCallback) -> TimerId;

    /// Suspends a timer without discarding it. Returns `false` for unknown
    /// or already paused timers.
    fn pause(&self, id: TimerId) -> bool;

    /// Resumes a paused timer; the next firing is one interval away.
    fn resume(&self, id: TimerId) -> bool;

    /// Discards a timer. Returns `false` when it did not exist.
    fn cancel(&self, id: TimerId) -> bool;

    /// Returns `true` while the timer exists, paused or not.
    fn is_scheduled(&self, id: TimerId) -> bool;
}

struct Timer {
    interval: Duration,
    due: Duration,
    paused: bool,
    callback: Option<TimerCallback>,
}

/// [`Scheduler`] whose clock only moves when [`ManualScheduler::advance`] is
/// called.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    timers: RefCell<BTreeMap<TimerId, Timer>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("timers", &self.timers.borrow().len())
            .finish_non_exhaustive()
    }
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl ManualScheduler {
    /// Creates a scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of live timers.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Moves the clock forward by `elapsed`, firing every timer that falls
    /// due in earliest-first order. Returns the number of callbacks run.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let deadline = self.now.get().saturating_add(elapsed);
        let mut fired = 0;
        while let Some((id, due)) = self.next_due(deadline) {
            self.now.set(due);
            let taken = self
                .timers
                .borrow_mut()
                .get_mut(&id)
                .and_then(|timer| timer.callback.take());
            let Some(mut callback) = taken else {
                continue;
            };
            trace!(target: SERVICES_TARGET, event = "timer_fired", timer = id.0);
            callback();
            fired += 1;
            if let Some(timer) = self.timers.borrow_mut().get_mut(&id) {
                timer.callback = Some(callback);
            }
        }
        self.now.set(deadline);
        fired
    }

    fn next_due(&self, deadline: Duration) -> Option<(TimerId, Duration)> {
        let mut timers = self.timers.borrow_mut();
        let (id, timer) = timers
            .iter_mut()
            .filter(|(_, timer)| !timer.paused && timer.callback.is_some())
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(id, timer)| (timer.due, **id))?;
        let due = timer.due;
        timer.due = due.saturating_add(timer.interval);
        Some((*id, due))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, interval: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let period = interval.max(MIN_INTERVAL);
        self.timers.borrow_mut().insert(
            id,
            Timer {
                interval: period,
                due: self.now.get().saturating_add(period),
                paused: false,
                callback: Some(callback),
            },
        );
        id
    }

    fn pause(&self, id: TimerId) -> bool {
        match self.timers.borrow_mut().get_mut(&id) {
            Some(timer) if !timer.paused => {
                timer.paused = true;
                true
            }
            _ => false,
        }
    }

    fn resume(&self, id: TimerId) -> bool {
        let now = self.now.get();
        match self.timers.borrow_mut().get_mut(&id) {
            Some(timer) if timer.paused => {
                timer.paused = false;
                timer.due = now.saturating_add(timer.interval);
                true
            }
            _ => false,
        }
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().remove(&id).is_some()
    }

    fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.borrow().contains_key(&id)
    }
}
