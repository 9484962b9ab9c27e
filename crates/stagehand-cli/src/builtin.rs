//! Tool classes and descriptors bundled with the binary.
//!
//! The catalog always provides the `panel` and `batch` classes. The bundled
//! registry is only used when the assets directory lists no tools.

use std::cell::RefCell;
use std::rc::Rc;

use stagehand_modes::Mode;
use stagehand_plugins::{
    BatchJob, BatchProcessor, PanelTool, ProcessingObserver, SharedTool, ToolCatalog,
    ToolCategory, ToolContext, ToolDescriptor, ToolError, ToolMetadata, ToolRegistry,
};
use stagehand_services::UiRegistry;
use tracing::{debug, info, warn};

use crate::CLI_TARGET;

/// Class of the UI panel tool.
pub(crate) const PANEL_CLASS: &str = "panel";
/// Class of the batch processing tool.
pub(crate) const BATCH_CLASS: &str = "batch";
/// Batches run by each bundled batch tool.
pub(crate) const DEFAULT_BATCHES: u32 = 5;

struct CountdownJob {
    tool: String,
    total: u32,
}

impl BatchJob for CountdownJob {
    fn total_batches(&self) -> u32 {
        self.total
    }

    fn process_batch(&mut self, index: u32) -> Result<(), ToolError> {
        debug!(target: CLI_TARGET, event = "batch_step", tool = %self.tool, index);
        Ok(())
    }

    fn finish(&mut self) -> String {
        format!("processed {} batches", self.total)
    }
}

struct ProgressLogger {
    tool: String,
}

impl ProcessingObserver for ProgressLogger {
    fn on_progress(&self, progress: f64, status: &str) {
        info!(target: CLI_TARGET, event = "batch_progress", tool = %self.tool, progress, status);
    }

    fn on_complete(&self, success: bool, result: &str) {
        if success {
            info!(target: CLI_TARGET, event = "batch_complete", tool = %self.tool, result);
        } else {
            warn!(target: CLI_TARGET, event = "batch_failed", tool = %self.tool, result);
        }
    }
}

fn panel(context: &ToolContext, descriptor: &ToolDescriptor) -> Result<SharedTool, ToolError> {
    let tool: SharedTool = Rc::new(RefCell::new(
        PanelTool::new(descriptor.metadata.clone(), context.ui()).with_widget(widget_path(&descriptor.id)),
    ));
    Ok(tool)
}

fn batch(context: &ToolContext, descriptor: &ToolDescriptor) -> Result<SharedTool, ToolError> {
    let job = CountdownJob {
        tool: descriptor.id.clone(),
        total: DEFAULT_BATCHES,
    };
    let processor = BatchProcessor::from_context(descriptor.metadata.clone(), Box::new(job), context);
    processor.subscribe(Rc::new(ProgressLogger {
        tool: descriptor.id.clone(),
    }));
    let tool: SharedTool = Rc::new(RefCell::new(processor));
    Ok(tool)
}

fn widget_path(id: &str) -> String {
    format!("/ui/tools/{id}")
}

/// Catalog of the bundled tool classes.
pub(crate) fn catalog() -> ToolCatalog {
    ToolCatalog::new()
        .with(PANEL_CLASS, Rc::new(panel))
        .with(BATCH_CLASS, Rc::new(batch))
}

/// Registry used when no tools are configured.
pub(crate) fn registry() -> ToolRegistry {
    ToolRegistry::new([
        ToolDescriptor::new(
            "inspector",
            PANEL_CLASS,
            ToolMetadata::new("Inspector")
                .with_category(ToolCategory::Analysis)
                .with_modes([Mode::InGame, Mode::Editor]),
        ),
        ToolDescriptor::new(
            "minimap",
            PANEL_CLASS,
            ToolMetadata::new("Minimap")
                .with_category(ToolCategory::Ui)
                .with_modes([Mode::InGame]),
        ),
        ToolDescriptor::new(
            "importer",
            BATCH_CLASS,
            ToolMetadata::new("Importer")
                .with_category(ToolCategory::Workflow)
                .with_dependencies(["inspector"]),
        ),
    ])
}

/// Adds a UI entry for every panel tool that lacks one.
pub(crate) fn register_panels(ui: &mut UiRegistry, tools: &ToolRegistry) {
    for descriptor in tools.iter().filter(|descriptor| descriptor.class == PANEL_CLASS) {
        let name = format!("Tool_{}", descriptor.metadata.name);
        if ui.find(&name).is_none() {
            ui.register(name, widget_path(&descriptor.id));
        }
    }
}
