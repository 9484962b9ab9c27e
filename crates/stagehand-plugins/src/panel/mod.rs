//! Tools presented through a widget on a UI layer.
//!
//! A [`PanelTool`] shows its widget when activated (when auto-show is set),
//! hides it when deactivated, and reacts to mode changes by hiding, swapping
//! to a mode-specific widget or showing again.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use stagehand_modes::Mode;
use stagehand_services::{UiLayer, UiLayerService, WidgetHandle};
use tracing::{info, warn};

use crate::PLUGIN_TARGET;
use crate::contract::{Tool, ToolCore};
use crate::error::ToolError;
use crate::metadata::ToolMetadata;

/// UI-bound tool variant.
pub struct PanelTool {
    core: ToolCore,
    ui: Rc<dyn UiLayerService>,
    layer: UiLayer,
    auto_show: bool,
    hide_on_mode_change: bool,
    widget: Option<WidgetHandle>,
    mode_widgets: BTreeMap<Mode, WidgetHandle>,
    shown: Option<WidgetHandle>,
}

impl PanelTool {
    /// Creates a panel on the menu layer that shows itself on activation
    /// and hides on every mode change.
    #[must_use]
    pub fn new(metadata: ToolMetadata, ui: Rc<dyn UiLayerService>) -> Self {
        Self {
            core: ToolCore::new(metadata),
            ui,
            layer: UiLayer::Menu,
            auto_show: true,
            hide_on_mode_change: true,
            widget: None,
            mode_widgets: BTreeMap::new(),
            shown: None,
        }
    }

    /// Sets the target layer.
    #[must_use]
    pub const fn on_layer(mut self, layer: UiLayer) -> Self {
        self.layer = layer;
        self
    }

    /// Controls whether activation shows the widget.
    #[must_use]
    pub const fn auto_show(mut self, auto_show: bool) -> Self {
        self.auto_show = auto_show;
        self
    }

    /// Controls whether a mode change hides the widget first.
    #[must_use]
    pub const fn hide_on_mode_change(mut self, hide: bool) -> Self {
        self.hide_on_mode_change = hide;
        self
    }

    /// Sets the widget used when no mode-specific widget applies.
    #[must_use]
    pub fn with_widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(WidgetHandle::new(widget));
        self
    }

    /// Uses `widget` while the current mode is `mode`.
    #[must_use]
    pub fn with_mode_widget(mut self, mode: Mode, widget: impl Into<String>) -> Self {
        self.mode_widgets.insert(mode, WidgetHandle::new(widget));
        self
    }

    /// Name under which the panel is pushed to the UI layer service.
    #[must_use]
    pub fn ui_name(&self) -> String {
        format!("Tool_{}", self.core.metadata().name)
    }

    /// Target layer.
    #[must_use]
    pub const fn layer(&self) -> UiLayer {
        self.layer
    }

    /// Returns `true` while the widget is shown.
    #[must_use]
    pub const fn is_ui_visible(&self) -> bool {
        self.shown.is_some()
    }

    /// Widget currently shown.
    #[must_use]
    pub const fn shown_widget(&self) -> Option<&WidgetHandle> {
        self.shown.as_ref()
    }

    /// Shows the widget unless it is already visible.
    pub fn show_ui(&mut self) {
        if self.is_ui_visible() {
            return;
        }
        let Some(widget) = self.create_widget() else {
            warn!(target: PLUGIN_TARGET, event = "panel_no_widget", tool = %self.core.metadata().name);
            return;
        };
        let name = self.ui_name();
        if !self.ui.push_ui(&name, self.layer) {
            warn!(target: PLUGIN_TARGET, event = "panel_push_rejected", ui = %name, layer = %self.layer);
            return;
        }
        info!(
            target: PLUGIN_TARGET,
            event = "panel_shown",
            ui = %name,
            widget = widget.name(),
            layer = %self.layer
        );
        self.shown = Some(widget);
    }

    /// Hides the widget when visible.
    pub fn hide_ui(&mut self) {
        if self.shown.take().is_none() {
            return;
        }
        self.ui.pop_ui(self.layer);
        info!(target: PLUGIN_TARGET, event = "panel_hidden", ui = %self.ui_name(), layer = %self.layer);
    }

    /// Re-shows a visible widget so the current mode's widget is picked up.
    pub fn refresh_ui(&mut self) {
        if self.is_ui_visible() {
            self.hide_ui();
            self.show_ui();
        }
    }
}

impl Tool for PanelTool {
    fn initialize(&mut self) -> Result<(), ToolError> {
        self.core.initialize();
        Ok(())
    }

    fn activate(&mut self) -> Result<(), ToolError> {
        self.core.initialize();
        if self.core.activate()? && self.auto_show {
            self.show_ui();
        }
        Ok(())
    }

    fn deactivate(&mut self) {
        self.hide_ui();
        self.core.deactivate();
    }

    fn shutdown(&mut self) {
        self.deactivate();
        self.core.shutdown();
    }

    fn metadata(&self) -> &ToolMetadata {
        self.core.metadata()
    }

    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn create_widget(&mut self) -> Option<WidgetHandle> {
        self.mode_widgets
            .get(&self.core.mode())
            .or(self.widget.as_ref())
            .cloned()
    }

    fn on_mode_changed(&mut self, mode: Mode) {
        if self.hide_on_mode_change {
            self.hide_ui();
        }
        self.core.set_mode(mode);
        if !self.core.is_active() {
            return;
        }
        if self.mode_widgets.contains_key(&mode) {
            self.refresh_ui();
        }
        if self.auto_show && self.can_activate_in_mode(mode) {
            self.show_ui();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for PanelTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelTool")
            .field("name", &self.core.metadata().name)
            .field("layer", &self.layer)
            .field("active", &self.core.is_active())
            .field("shown", &self.shown)
            .finish_non_exhaustive()
    }
}
