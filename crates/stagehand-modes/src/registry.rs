//! Descriptive catalogue of the modes a host exposes.

use serde::{Deserialize, Serialize};
use stagehand_config::{AssetKind, AssetPaths, load_asset_or_default};

use crate::mode::Mode;

/// Descriptive record for a single [`Mode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModeRegistryEntry {
    /// Mode described by the entry.
    pub mode: Mode,
    /// Human-readable name.
    pub display_name: String,
    /// Longer description shown to users.
    pub description: String,
    /// Resource loaded when the mode is entered, such as a level name.
    pub level: Option<String>,
    /// Icon reference for menus.
    pub icon: Option<String>,
}

impl ModeRegistryEntry {
    /// Creates an entry with a display name and no resources.
    #[must_use]
    pub fn new(mode: Mode, display_name: impl Into<String>) -> Self {
        Self {
            mode,
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Attaches the resource loaded with the mode.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

/// Ordered collection of [`ModeRegistryEntry`] values.
///
/// An empty registry places no constraint on mode transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ModeRegistry {
    entries: Vec<ModeRegistryEntry>,
}

impl ModeRegistry {
    /// Builds a registry from entries, keeping the last entry for a mode.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = ModeRegistryEntry>) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            registry.insert(entry);
        }
        registry
    }

    /// Loads the registry asset, falling back to an empty registry.
    #[must_use]
    pub fn from_assets(paths: Option<&AssetPaths>) -> Self {
        let loaded: Self = load_asset_or_default(paths, AssetKind::Modes);
        Self::new(loaded.entries)
    }

    /// Inserts or replaces the entry for its mode.
    pub fn insert(&mut self, entry: ModeRegistryEntry) {
        let Some(existing) = self.entries.iter_mut().find(|slot| slot.mode == entry.mode) else {
            self.entries.push(entry);
            return;
        };
        *existing = entry;
    }

    /// Returns the entry describing `mode`.
    #[must_use]
    pub fn find(&self, mode: Mode) -> Option<&ModeRegistryEntry> {
        self.entries.iter().find(|entry| entry.mode == mode)
    }

    /// Returns `true` when `mode` has an entry.
    #[must_use]
    pub fn contains(&self, mode: Mode) -> bool {
        self.find(mode).is_some()
    }

    /// Returns `true` when no modes are described.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of described modes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ModeRegistryEntry> {
        self.entries.iter()
    }
}
