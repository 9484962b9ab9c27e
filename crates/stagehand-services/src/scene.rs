//! Sequenced scene streaming.
//!
//! [`SceneManager`] translates scene names to levels through a
//! [`SceneRegistry`] and drives a host [`SceneStreamer`]. A switch queues the
//! target scene and unloads the current one; the next queued scene is only
//! loaded once that unload has completed, either synchronously or through
//! [`SceneManager::complete_unload`]. [`SceneObserver`]s hear about each
//! level streamed in and each unload that has finished.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use stagehand_config::{AssetKind, AssetPaths, load_asset_or_default};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::SERVICES_TARGET;

/// Completion state reported by [`SceneStreamer::unload_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadStatus {
    /// The level is already gone.
    Completed,
    /// The host will call [`SceneManager::complete_unload`] later.
    Pending,
}

/// Host level-streaming service.
pub trait SceneStreamer {
    /// Streams in `level`, optionally making it visible.
    fn load_level(&self, level: &str, visible: bool);

    /// Streams out `level`.
    fn unload_level(&self, level: &str) -> UnloadStatus;
}

/// Scene lifecycle notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    /// The scene's level was streamed in.
    Loaded(String),
    /// The scene's level is gone.
    Unloaded(String),
}

/// Receives [`SceneEvent`]s.
pub trait SceneObserver {
    /// Called once the manager's state reflects `event`.
    fn on_scene_event(&self, event: &SceneEvent);
}

impl<F> SceneObserver for F
where
    F: Fn(&SceneEvent),
{
    fn on_scene_event(&self, event: &SceneEvent) {
        self(event);
    }
}

/// Registered scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneEntry {
    /// Name callers switch to.
    pub name: String,
    /// Level streamed for the scene.
    pub level: String,
}

/// Catalogue of known scenes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SceneRegistry {
    scenes: Vec<SceneEntry>,
}

impl SceneRegistry {
    /// Builds a registry from entries.
    #[must_use]
    pub fn new(scenes: impl IntoIterator<Item = SceneEntry>) -> Self {
        Self {
            scenes: scenes.into_iter().collect(),
        }
    }

    /// Loads the scene asset, falling back to an empty registry.
    #[must_use]
    pub fn from_assets(paths: Option<&AssetPaths>) -> Self {
        load_asset_or_default(paths, AssetKind::Scenes)
    }

    /// Returns the entry named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&SceneEntry> {
        self.scenes.iter().find(|scene| scene.name == name)
    }
}

/// Errors raised by [`SceneManager`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// No scene with this name is registered.
    #[error("scene '{name}' is not registered")]
    UnknownScene {
        /// Requested scene.
        name: String,
    },
}

#[derive(Default)]
struct SceneState {
    current: Option<String>,
    queue: VecDeque<String>,
    awaiting_unload: Option<String>,
}

/// Sequences scene loads and unloads against a [`SceneStreamer`].
pub struct SceneManager {
    registry: SceneRegistry,
    streamer: Rc<dyn SceneStreamer>,
    state: RefCell<SceneState>,
    observers: RefCell<Vec<Rc<dyn SceneObserver>>>,
}

impl SceneManager {
    /// Creates a manager with no scene loaded.
    #[must_use]
    pub fn new(registry: SceneRegistry, streamer: Rc<dyn SceneStreamer>) -> Self {
        Self {
            registry,
            streamer,
            state: RefCell::new(SceneState::default()),
            observers: RefCell::new(Vec::new()),
        }
    }

    /// Registers an observer for subsequent scene events.
    pub fn subscribe(&self, observer: Rc<dyn SceneObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Scene most recently loaded and not yet unloaded.
    #[must_use]
    pub fn current_scene(&self) -> Option<String> {
        self.state.borrow().current.clone()
    }

    /// Scenes waiting to be loaded, oldest first.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.state.borrow().queue.iter().cloned().collect()
    }

    /// Returns `true` while an unload is in flight.
    #[must_use]
    pub fn is_awaiting_unload(&self) -> bool {
        self.state.borrow().awaiting_unload.is_some()
    }

    /// Loads `name` immediately and makes it current.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownScene`] when `name` is not registered.
    pub fn load_scene(&self, name: &str, visible: bool) -> Result<(), SceneError> {
        let entry = self.entry(name)?;
        self.streamer.load_level(&entry.level, visible);
        self.state.borrow_mut().current = Some(name.to_owned());
        info!(target: SERVICES_TARGET, event = "scene_loaded", scene = name, level = %entry.level, "scene loaded");
        self.publish(&SceneEvent::Loaded(name.to_owned()));
        Ok(())
    }

    /// Unloads `name`, clearing it as current when it was.
    ///
    /// [`SceneEvent::Unloaded`] is published at once when the streamer
    /// reports [`UnloadStatus::Completed`]; a pending unload started by a
    /// switch is published from [`SceneManager::complete_unload`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownScene`] when `name` is not registered.
    pub fn unload_scene(&self, name: &str) -> Result<UnloadStatus, SceneError> {
        let entry = self.entry(name)?;
        {
            let mut state = self.state.borrow_mut();
            if state.current.as_deref() == Some(name) {
                state.current = None;
            }
        }
        let status = self.streamer.unload_level(&entry.level);
        info!(target: SERVICES_TARGET, event = "scene_unloaded", scene = name, level = %entry.level, ?status, "scene unloaded");
        if status == UnloadStatus::Completed {
            self.publish(&SceneEvent::Unloaded(name.to_owned()));
        }
        Ok(status)
    }

    /// Queues `name` and starts replacing the current scene.
    pub fn switch_scene(&self, name: &str) {
        let occupied = {
            let mut state = self.state.borrow_mut();
            state.queue.push_back(name.to_owned());
            if state.awaiting_unload.is_some() {
                debug!(target: SERVICES_TARGET, event = "scene_queued", scene = name);
                return;
            }
            state.current.clone()
        };
        occupied.map_or_else(|| self.process_next(), |scene| self.begin_unload(&scene));
    }

    /// Signals that an unload reported as [`UnloadStatus::Pending`] has
    /// finished. Returns `false` when `name` was not being unloaded.
    pub fn complete_unload(&self, name: &str) -> bool {
        if self.state.borrow().awaiting_unload.as_deref() != Some(name) {
            return false;
        }
        self.publish(&SceneEvent::Unloaded(name.to_owned()));
        self.finish_unload();
        true
    }

    fn begin_unload(&self, scene: &str) {
        self.state.borrow_mut().awaiting_unload = Some(scene.to_owned());
        match self.unload_scene(scene) {
            Ok(UnloadStatus::Completed) => self.finish_unload(),
            Ok(UnloadStatus::Pending) => {}
            Err(error) => {
                warn!(target: SERVICES_TARGET, event = "scene_unload_failed", error = %error);
                self.finish_unload();
            }
        }
    }

    fn finish_unload(&self) {
        self.state.borrow_mut().awaiting_unload = None;
        self.process_next();
    }

    fn publish(&self, event: &SceneEvent) {
        let observers: Vec<_> = self.observers.borrow().iter().map(Rc::clone).collect();
        for observer in observers {
            observer.on_scene_event(event);
        }
    }

    fn process_next(&self) {
        loop {
            let queued = self.state.borrow_mut().queue.pop_front();
            let Some(next) = queued else {
                return;
            };
            if self.load_scene(&next, true).is_err() {
                continue;
            }
            if !self.state.borrow().queue.is_empty() {
                self.begin_unload(&next);
            }
            return;
        }
    }

    fn entry(&self, name: &str) -> Result<SceneEntry, SceneError> {
        self.registry.find(name).cloned().ok_or_else(|| {
            warn!(target: SERVICES_TARGET, event = "scene_unknown", scene = name, "scene not found");
            SceneError::UnknownScene {
                name: name.to_owned(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rstest::{fixture, rstest};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Load(String),
        Unload(String),
    }

    struct RecordingStreamer {
        calls: RefCell<Vec<Call>>,
        deferred: bool,
    }

    impl SceneStreamer for RecordingStreamer {
        fn load_level(&self, level: &str, _visible: bool) {
            self.calls.borrow_mut().push(Call::Load(level.to_owned()));
        }

        fn unload_level(&self, level: &str) -> UnloadStatus {
            self.calls.borrow_mut().push(Call::Unload(level.to_owned()));
            if self.deferred {
                UnloadStatus::Pending
            } else {
                UnloadStatus::Completed
            }
        }
    }

    fn registry() -> SceneRegistry {
        SceneRegistry::new(["Lobby", "City", "Harbour"].map(|name| SceneEntry {
            name: name.to_owned(),
            level: format!("/levels/{name}"),
        }))
    }

    fn setup(deferred: bool) -> (SceneManager, Rc<RecordingStreamer>) {
        let streamer = Rc::new(RecordingStreamer {
            calls: RefCell::new(Vec::new()),
            deferred,
        });
        let manager = SceneManager::new(registry(), Rc::clone(&streamer) as Rc<dyn SceneStreamer>);
        (manager, streamer)
    }

    #[fixture]
    fn immediate() -> (SceneManager, Rc<RecordingStreamer>) {
        setup(false)
    }

    fn load(level: &str) -> Call {
        Call::Load(format!("/levels/{level}"))
    }

    fn unload(level: &str) -> Call {
        Call::Unload(format!("/levels/{level}"))
    }

    #[rstest]
    fn first_switch_loads_directly(immediate: (SceneManager, Rc<RecordingStreamer>)) {
        let (manager, streamer) = immediate;

        manager.switch_scene("Lobby");

        assert_eq!(*streamer.calls.borrow(), [load("Lobby")]);
        assert_eq!(manager.current_scene().as_deref(), Some("Lobby"));
    }

    #[rstest]
    fn switching_unloads_before_loading(immediate: (SceneManager, Rc<RecordingStreamer>)) {
        let (manager, streamer) = immediate;
        manager.switch_scene("Lobby");

        manager.switch_scene("City");

        assert_eq!(
            *streamer.calls.borrow(),
            [load("Lobby"), unload("Lobby"), load("City")]
        );
        assert_eq!(manager.current_scene().as_deref(), Some("City"));
    }

    #[test]
    fn pending_unload_holds_the_queue() {
        let (manager, streamer) = setup(true);
        manager.switch_scene("Lobby");
        manager.switch_scene("City");
        manager.switch_scene("Harbour");

        assert!(manager.is_awaiting_unload());
        assert_eq!(manager.current_scene(), None);
        assert_eq!(manager.queued(), ["City", "Harbour"]);

        // City loads, then is unloaded at once because Harbour is queued.
        assert!(manager.complete_unload("Lobby"));
        assert_eq!(manager.current_scene(), None);
        assert!(manager.is_awaiting_unload());
        assert!(!manager.complete_unload("Lobby"));

        assert!(manager.complete_unload("City"));
        assert_eq!(manager.current_scene().as_deref(), Some("Harbour"));
        assert!(!manager.is_awaiting_unload());
        assert_eq!(
            *streamer.calls.borrow(),
            [
                load("Lobby"),
                unload("Lobby"),
                load("City"),
                unload("City"),
                load("Harbour"),
            ]
        );
    }

    #[rstest]
    fn unknown_scenes_are_skipped(immediate: (SceneManager, Rc<RecordingStreamer>)) {
        let (manager, streamer) = immediate;

        manager.switch_scene("Nowhere");

        assert!(streamer.calls.borrow().is_empty());
        assert_eq!(
            manager.load_scene("Nowhere", true),
            Err(SceneError::UnknownScene {
                name: String::from("Nowhere")
            })
        );
    }

    #[test]
    fn observers_hear_loads_and_finished_unloads() {
        let (manager, _streamer) = setup(true);
        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&heard);
        manager.subscribe(Rc::new(move |event: &SceneEvent| {
            sink.borrow_mut().push(event.clone());
        }));

        manager.switch_scene("Lobby");
        manager.switch_scene("City");
        assert_eq!(*heard.borrow(), [SceneEvent::Loaded(String::from("Lobby"))]);

        assert!(manager.complete_unload("Lobby"));
        assert_eq!(
            *heard.borrow(),
            [
                SceneEvent::Loaded(String::from("Lobby")),
                SceneEvent::Unloaded(String::from("Lobby")),
                SceneEvent::Loaded(String::from("City")),
            ]
        );
    }

    #[rstest]
    fn immediate_unloads_are_reported_once(immediate: (SceneManager, Rc<RecordingStreamer>)) {
        let (manager, _streamer) = immediate;
        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&heard);
        manager.subscribe(Rc::new(move |event: &SceneEvent| {
            sink.borrow_mut().push(event.clone());
        }));

        manager.switch_scene("Lobby");
        manager.switch_scene("City");

        assert_eq!(
            *heard.borrow(),
            [
                SceneEvent::Loaded(String::from("Lobby")),
                SceneEvent::Unloaded(String::from("Lobby")),
                SceneEvent::Loaded(String::from("City")),
            ]
        );
    }

    #[rstest]
    fn stray_completion_is_ignored(immediate: (SceneManager, Rc<RecordingStreamer>)) {
        let (manager, _streamer) = immediate;
        assert!(!manager.complete_unload("Lobby"));
    }
}
