//! Unit tests for the tool registry.

use camino::Utf8Path;
use rstest::{fixture, rstest};
use stagehand_config::AssetPaths;
use tempfile::TempDir;

use super::*;
use crate::metadata::ToolMetadata;

fn descriptor(id: &str, category: ToolCategory, modes: &[Mode]) -> ToolDescriptor {
    let mut metadata = ToolMetadata::new(id).with_category(category);
    if !modes.is_empty() {
        metadata = metadata.with_modes(modes.iter().copied());
    }
    ToolDescriptor::new(id, "panel", metadata)
}

#[fixture]
fn registry() -> ToolRegistry {
    ToolRegistry::new([
        descriptor("inspector", ToolCategory::Analysis, &[Mode::InGame]),
        descriptor("minimap", ToolCategory::Ui, &[]),
        descriptor("profiler", ToolCategory::Analysis, &[Mode::Editor]),
    ])
}

fn ids<'a>(tools: impl IntoIterator<Item = &'a ToolDescriptor>) -> Vec<&'a str> {
    tools.into_iter().map(|tool| tool.id.as_str()).collect()
}

#[rstest]
fn register_upserts_in_place(mut registry: ToolRegistry) {
    let replacement = descriptor("inspector", ToolCategory::Workflow, &[]);

    assert!(registry.register_tool(replacement.clone()));

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.find_tool("inspector"), Some(&replacement));
    assert_eq!(ids(registry.iter()), ["inspector", "minimap", "profiler"]);
}

#[rstest]
fn unregister_reports_removal(mut registry: ToolRegistry) {
    assert!(registry.unregister_tool("minimap"));
    assert!(!registry.unregister_tool("minimap"));
    assert!(!registry.contains("minimap"));
}

#[rstest]
fn category_query_preserves_order(registry: ToolRegistry) {
    assert_eq!(
        ids(registry.tools_by_category(ToolCategory::Analysis)),
        ["inspector", "profiler"]
    );
}

#[rstest]
#[case::in_game(Mode::InGame, &["inspector", "minimap"])]
#[case::editor(Mode::Editor, &["minimap", "profiler"])]
#[case::main_menu(Mode::MainMenu, &["minimap"])]
fn mode_query_treats_empty_support_as_wildcard(
    registry: ToolRegistry,
    #[case] mode: Mode,
    #[case] expected: &[&str],
) {
    assert_eq!(ids(registry.tools_for_mode(mode)), expected);
}

#[test]
fn loads_from_the_tools_asset() {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8Path::from_path(dir.path()).expect("utf-8 temp path");
    std::fs::write(
        root.join("tools.json"),
        r#"[{"id":"inspector","class":"panel"},{"id":"inspector","class":"batch"}]"#,
    )
    .expect("write asset");

    let registry = ToolRegistry::from_assets(Some(&AssetPaths::new(root)));

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.find_tool("inspector").map(|tool| tool.class.as_str()),
        Some("batch")
    );
}

#[test]
fn missing_asset_yields_an_empty_registry() {
    assert!(ToolRegistry::from_assets(None).is_empty());
}
