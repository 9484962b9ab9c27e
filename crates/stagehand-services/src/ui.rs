//! Layered UI surface.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stagehand_config::{AssetKind, AssetPaths, load_asset_or_default};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

use crate::SERVICES_TARGET;

/// Stacking layer a widget is shown on. Later variants draw above earlier
/// ones.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UiLayer {
    /// Full-screen backdrops.
    Background,
    /// Heads-up display.
    Hud,
    /// Menus and panels.
    Menu,
    /// Transient dialogs.
    Popup,
}

/// Opaque reference to a widget created for a tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetHandle(String);

impl WidgetHandle {
    /// Wraps a widget name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Widget name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Outbound interface to the host's UI layer manager.
pub trait UiLayerService {
    /// Shows the widget registered as `name` on `layer`, replacing any widget
    /// already on that layer. Returns `false` when the name is unknown.
    fn push_ui(&self, name: &str, layer: UiLayer) -> bool;

    /// Removes the widget on `layer`. Returns `false` when the layer was
    /// empty.
    fn pop_ui(&self, layer: UiLayer) -> bool;

    /// Removes every widget.
    fn pop_all(&self);
}

/// Registered widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiEntry {
    /// Name used by callers of [`UiLayerService::push_ui`].
    pub name: String,
    /// Widget class reference resolved by the host.
    pub widget: String,
}

/// Catalogue of widgets that may be pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UiRegistry {
    entries: Vec<UiEntry>,
}

impl UiRegistry {
    /// Builds a registry from entries.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = UiEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Loads the UI asset, falling back to an empty registry.
    #[must_use]
    pub fn from_assets(paths: Option<&AssetPaths>) -> Self {
        load_asset_or_default(paths, AssetKind::Ui)
    }

    /// Registers a widget under `name`.
    pub fn register(&mut self, name: impl Into<String>, widget: impl Into<String>) {
        self.entries.push(UiEntry {
            name: name.into(),
            widget: widget.into(),
        });
    }

    /// Returns the entry registered under `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&UiEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Returns `true` when no widgets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory [`UiLayerService`] keeping at most one widget per layer.
#[derive(Debug, Default)]
pub struct UiLayerStack {
    registry: UiRegistry,
    active: RefCell<BTreeMap<UiLayer, String>>,
}

impl UiLayerStack {
    /// Creates a stack resolving names against `registry`.
    #[must_use]
    pub fn new(registry: UiRegistry) -> Self {
        Self {
            registry,
            active: RefCell::new(BTreeMap::new()),
        }
    }

    /// Name of the widget shown on `layer`.
    #[must_use]
    pub fn widget_on(&self, layer: UiLayer) -> Option<String> {
        self.active.borrow().get(&layer).cloned()
    }

    /// Snapshot of every occupied layer, bottom first.
    #[must_use]
    pub fn visible(&self) -> Vec<(UiLayer, String)> {
        self.active
            .borrow()
            .iter()
            .map(|(layer, name)| (*layer, name.clone()))
            .collect()
    }
}

impl UiLayerService for UiLayerStack {
    fn push_ui(&self, name: &str, layer: UiLayer) -> bool {
        if self.registry.find(name).is_none() {
            warn!(
                target: SERVICES_TARGET,
                event = "ui_unknown",
                name,
                layer = %layer,
                "widget is not registered"
            );
            return false;
        }
        let replaced = self.active.borrow_mut().insert(layer, name.to_owned());
        if let Some(previous) = replaced {
            debug!(target: SERVICES_TARGET, event = "ui_replaced", previous = %previous, layer = %layer);
        }
        info!(target: SERVICES_TARGET, event = "ui_pushed", name, layer = %layer, "widget shown");
        true
    }

    fn pop_ui(&self, layer: UiLayer) -> bool {
        let removed = self.active.borrow_mut().remove(&layer);
        removed.is_some_and(|name| {
            info!(target: SERVICES_TARGET, event = "ui_popped", name = %name, layer = %layer, "widget hidden");
            true
        })
    }

    fn pop_all(&self) {
        let drained = std::mem::take(&mut *self.active.borrow_mut());
        for (layer, name) in drained {
            info!(target: SERVICES_TARGET, event = "ui_popped", name = %name, layer = %layer, "widget hidden");
        }
    }
}
