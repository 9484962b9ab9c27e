//! Tool lifecycle notifications.

use std::collections::VecDeque;

use stagehand_config::DEFAULT_EVENT_HISTORY;
use strum::Display;

/// Lifecycle change published by the plugin manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ToolEvent {
    /// A descriptor was registered or replaced.
    Registered {
        /// Tool id.
        id: String,
    },
    /// A descriptor was removed.
    Unregistered {
        /// Tool id.
        id: String,
    },
    /// A tool became active.
    Activated {
        /// Tool id.
        id: String,
    },
    /// A tool left the active state.
    Deactivated {
        /// Tool id.
        id: String,
    },
}

impl ToolEvent {
    /// Id of the tool the event concerns.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Registered { id }
            | Self::Unregistered { id }
            | Self::Activated { id }
            | Self::Deactivated { id } => id,
        }
    }
}

/// Receives [`ToolEvent`]s once the emitting operation has completed.
pub trait ToolEventObserver {
    /// Called once per event, in emission order.
    fn on_tool_event(&self, event: &ToolEvent);
}

impl<F> ToolEventObserver for F
where
    F: Fn(&ToolEvent),
{
    fn on_tool_event(&self, event: &ToolEvent) {
        self(event);
    }
}

/// Bounded record of recent events, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<ToolEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_HISTORY)
    }
}

impl EventLog {
    /// Creates a log keeping at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `event`, discarding the oldest entry when full.
    pub fn record(&mut self, event: ToolEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ToolEvent> {
        self.entries.iter().cloned().collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
