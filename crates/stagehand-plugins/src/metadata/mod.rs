//! Static description of a tool.
//!
//! [`ToolMetadata`] is what a tool reports about itself; a
//! [`ToolDescriptor`] binds that metadata to a registry id and the class the
//! catalog instantiates.

use serde::{Deserialize, Serialize};
use stagehand_modes::Mode;
use strum::{Display, EnumIter, EnumString};

/// Default activation priority.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Grouping used by menus and queries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum ToolCategory {
    /// Measurement and inspection.
    Analysis,
    /// Panels and overlays.
    Ui,
    /// Small helpers.
    Utility,
    /// Multi-step processes.
    Workflow,
    /// Anything else.
    #[default]
    Custom,
}

/// Where a tool is meaningful.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ToolScope {
    /// Available everywhere.
    #[default]
    Global,
    /// Restricted to the listed modes.
    ModeSpecific,
    /// Bound to a loaded scene.
    SceneSpecific,
}

/// Descriptive data reported by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolMetadata {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Version string.
    pub version: String,
    /// Author or owning team.
    pub author: String,
    /// Menu grouping.
    pub category: ToolCategory,
    /// Availability scope.
    pub scope: ToolScope,
    /// Modes the tool may stay active in; empty means every mode.
    pub supported_modes: Vec<Mode>,
    /// Activation priority; lower values sort first.
    pub priority: i32,
    /// Whether a scene must be loaded for the tool to work.
    pub requires_scene: bool,
    /// Ids of tools this one relies on, in load order.
    pub dependencies: Vec<String>,
}

impl Default for ToolMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            version: String::new(),
            author: String::new(),
            category: ToolCategory::default(),
            scope: ToolScope::default(),
            supported_modes: Vec::new(),
            priority: DEFAULT_PRIORITY,
            requires_scene: false,
            dependencies: Vec::new(),
        }
    }
}

impl ToolMetadata {
    /// Creates metadata with defaults for everything except the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }

    /// Restricts the tool to `modes` and marks it mode-specific.
    #[must_use]
    pub fn with_modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
        self.supported_modes = modes.into_iter().collect();
        self.scope = ToolScope::ModeSpecific;
        self
    }

    /// Sets the scope without touching the supported modes.
    #[must_use]
    pub fn with_scope(mut self, scope: ToolScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the dependency list.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the tool as needing a loaded scene.
    #[must_use]
    pub fn requiring_scene(mut self) -> Self {
        self.requires_scene = true;
        self
    }

    /// Returns `true` when the tool may be active in `mode`.
    #[must_use]
    pub fn supports_mode(&self, mode: Mode) -> bool {
        self.supported_modes.is_empty() || self.supported_modes.contains(&mode)
    }
}

/// Registry entry binding an id to a catalogued class and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolDescriptor {
    /// Unique, non-empty identifier.
    pub id: String,
    /// Catalog class used to build instances.
    pub class: String,
    /// Descriptive metadata.
    pub metadata: ToolMetadata,
    /// Disabled tools are never instantiated.
    pub enabled: bool,
    /// Instantiate eagerly when the plugin manager starts.
    pub auto_load: bool,
}

impl Default for ToolDescriptor {
    fn default() -> Self {
        Self {
            id: String::new(),
            class: String::new(),
            metadata: ToolMetadata::default(),
            enabled: true,
            auto_load: false,
        }
    }
}

impl ToolDescriptor {
    /// Creates an enabled descriptor that is loaded on demand.
    #[must_use]
    pub fn new(id: impl Into<String>, class: impl Into<String>, metadata: ToolMetadata) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            metadata,
            ..Self::default()
        }
    }

    /// Sets the auto-load flag.
    #[must_use]
    pub const fn auto_loaded(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
