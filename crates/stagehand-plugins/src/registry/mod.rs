//! Persistent catalogue of tool descriptors.

use serde::{Deserialize, Serialize};
use stagehand_config::{AssetKind, AssetPaths, load_asset_or_default};
use stagehand_modes::Mode;

use crate::metadata::{ToolCategory, ToolDescriptor};

/// Ordered list of [`ToolDescriptor`]s keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Builds a registry, later descriptors replacing earlier ones with the
    /// same id.
    #[must_use]
    pub fn new(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.register_tool(descriptor);
        }
        registry
    }

    /// Loads the tool asset, falling back to an empty registry.
    #[must_use]
    pub fn from_assets(paths: Option<&AssetPaths>) -> Self {
        let loaded: Self = load_asset_or_default(paths, AssetKind::Tools);
        Self::new(loaded.tools)
    }

    /// Returns the descriptor registered under `id`.
    #[must_use]
    pub fn find_tool(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.id == id)
    }

    /// Returns `true` when `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.find_tool(id).is_some()
    }

    /// Inserts `descriptor`, replacing an existing entry in place. Returns
    /// `true` when an entry was replaced.
    pub fn register_tool(&mut self, descriptor: ToolDescriptor) -> bool {
        if let Some(existing) = self.tools.iter_mut().find(|tool| tool.id == descriptor.id) {
            *existing = descriptor;
            return true;
        }
        self.tools.push(descriptor);
        false
    }

    /// Removes the entry for `id`. Returns `false` when none existed.
    pub fn unregister_tool(&mut self, id: &str) -> bool {
        let before = self.tools.len();
        self.tools.retain(|tool| tool.id != id);
        self.tools.len() != before
    }

    /// Descriptors in `category`, in registration order.
    #[must_use]
    pub fn tools_by_category(&self, category: ToolCategory) -> Vec<&ToolDescriptor> {
        self.tools
            .iter()
            .filter(|tool| tool.metadata.category == category)
            .collect()
    }

    /// Descriptors usable in `mode`, in registration order.
    #[must_use]
    pub fn tools_for_mode(&self, mode: Mode) -> Vec<&ToolDescriptor> {
        self.tools
            .iter()
            .filter(|tool| tool.metadata.supports_mode(mode))
            .collect()
    }

    /// Iterates over every descriptor in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests;
