//! Runtime assembly.
//!
//! [`bootstrap`] installs telemetry, reads the data assets and wires the
//! mode manager, UI stack, scheduler and plugin manager together behind a
//! [`Console`].

use std::rc::Rc;

use stagehand_config::Config;
use stagehand_modes::{AppStateController, ModeManager, ModeRegistry, ModeTransitionTable};
use stagehand_plugins::{
    Console, PluginError, PluginManager, ToolContext, ToolEvent, ToolRegistry,
};
use stagehand_services::{ManualScheduler, UiLayerStack, UiRegistry};
use thiserror::Error;
use tracing::info;

use crate::CLI_TARGET;
use crate::builtin;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// An assembled runtime.
pub struct Runtime {
    config: Config,
    telemetry: TelemetryHandle,
    plugins: Rc<PluginManager>,
    ui: Rc<UiLayerStack>,
    console: Console,
}

impl Runtime {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The plugin manager.
    #[must_use]
    pub const fn plugins(&self) -> &Rc<PluginManager> {
        &self.plugins
    }

    /// The in-memory UI layer stack.
    #[must_use]
    pub const fn ui(&self) -> &Rc<UiLayerStack> {
        &self.ui
    }

    /// Console bound to this runtime.
    #[must_use]
    pub const fn console(&self) -> &Console {
        &self.console
    }

    /// Deactivates and shuts down every tool.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when a tool operation is still in progress.
    pub fn shutdown(&self) -> Result<(), PluginError> {
        self.plugins.shutdown()
    }
}

/// Bootstraps the runtime from `config`, reporting progress to `reporter`.
///
/// # Errors
///
/// Returns [`BootstrapError`] when telemetry cannot be installed.
pub fn bootstrap(config: Config, reporter: &dyn HealthReporter) -> Result<Runtime, BootstrapError> {
    reporter.bootstrap_starting();

    let telemetry = telemetry::initialise(&config)
        .map_err(|source| BootstrapError::Telemetry { source })
        .inspect_err(|error| reporter.bootstrap_failed(error))?;

    let runtime = assemble(config, telemetry);
    let tools = runtime.plugins.available_tools();
    for id in &tools {
        if let Some(report) = runtime.plugins.validate_tool(id)
            && !report.issues().is_empty()
        {
            reporter.tool_findings(&report);
        }
    }
    reporter.bootstrap_succeeded(&runtime.config, tools.len());
    Ok(runtime)
}

fn assemble(config: Config, telemetry: TelemetryHandle) -> Runtime {
    let paths = config.asset_paths();
    let modes = Rc::new(ModeManager::new(
        ModeRegistry::from_assets(paths.as_ref()),
        ModeTransitionTable::from_assets(paths.as_ref()),
    ));

    let catalog = builtin::catalog();
    let mut registry = ToolRegistry::from_assets(paths.as_ref());
    if registry.is_empty() {
        info!(target: CLI_TARGET, event = "bundled_tools", "no tools configured; using bundled tools");
        registry = builtin::registry();
    }

    let mut widgets = UiRegistry::from_assets(paths.as_ref());
    builtin::register_panels(&mut widgets, &registry);
    let ui = Rc::new(UiLayerStack::new(widgets));
    let clock = Rc::new(ManualScheduler::new());

    let context = ToolContext::new(Rc::clone(&modes), Rc::clone(&ui) as _, Rc::clone(&clock) as _)
        .with_batch_interval(config.batch_interval());
    let plugins = PluginManager::with_history(context, catalog, registry, config.event_history());
    plugins.subscribe_events(Rc::new(|event: &ToolEvent| {
        info!(target: CLI_TARGET, event = %event, tool = event.id(), "tool event");
    }));

    let app_state = Rc::new(AppStateController::new(modes));
    let console = Console::new(Rc::clone(&plugins), app_state, clock);
    Runtime {
        config,
        telemetry,
        plugins,
        ui,
        console,
    }
}

#[cfg(test)]
mod tests;
