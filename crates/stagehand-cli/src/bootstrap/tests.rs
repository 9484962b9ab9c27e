//! Unit tests for runtime assembly.

use camino::Utf8Path;
use mockall::mock;
use rstest::{fixture, rstest};
use stagehand_plugins::ValidationReport;
use stagehand_services::UiLayer;
use tempfile::TempDir;

use super::*;

mock! {
    Reporter {}

    impl HealthReporter for Reporter {
        fn bootstrap_starting(&self);
        fn bootstrap_succeeded(&self, config: &Config, tools: usize);
        fn bootstrap_failed(&self, error: &BootstrapError);
        fn tool_findings(&self, report: &ValidationReport);
        fn session_finished(&self, executed: usize, failed: usize);
    }
}

#[fixture]
fn quiet_reporter() -> MockReporter {
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter.expect_bootstrap_succeeded().times(1).return_const(());
    reporter.expect_tool_findings().never();
    reporter.expect_bootstrap_failed().never();
    reporter
}

fn assets(files: &[(&str, &str)]) -> (TempDir, Config) {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).expect("write asset");
    }
    let root = Utf8Path::from_path(dir.path())
        .expect("temp dir is utf-8")
        .to_path_buf();
    let config = Config {
        assets_dir: Some(root),
        ..Config::default()
    };
    (dir, config)
}

#[rstest]
fn bundled_tools_are_used_without_assets(quiet_reporter: MockReporter) {
    let runtime = bootstrap(Config::default(), &quiet_reporter).expect("bootstrap");

    assert_eq!(
        runtime.plugins().available_tools(),
        ["inspector", "minimap", "importer"]
    );
    assert!(runtime.plugins().active_tools().is_empty());
}

#[rstest]
fn console_commands_reach_the_assembled_services(quiet_reporter: MockReporter) {
    let runtime = bootstrap(Config::default(), &quiet_reporter).expect("bootstrap");
    let console = runtime.console();

    console.execute("set-mode in_game").expect("enter in_game");
    console.execute("activate-tool inspector").expect("activate");

    assert_eq!(
        runtime.ui().visible(),
        [(UiLayer::Menu, String::from("Tool_Inspector"))]
    );

    console.execute("set-mode main_menu").expect("enter main_menu");

    assert!(runtime.plugins().active_tools().is_empty());
    assert!(runtime.ui().visible().is_empty());
}

#[rstest]
fn batch_tools_follow_the_configured_interval() {
    let (_dir, mut config) = assets(&[]);
    config.batch_interval_ms = Some(250);
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().return_const(());
    reporter
        .expect_bootstrap_succeeded()
        .withf(|_, tools| *tools == 3)
        .times(1)
        .return_const(());

    let runtime = bootstrap(config, &reporter).expect("bootstrap");
    let console = runtime.console();
    console.execute("activate-tool importer").expect("activate");
    console.execute("start-batch importer").expect("start");

    assert_eq!(
        console.execute("tick 1000").expect("tick"),
        "advanced 1000 ms; 4 timers fired"
    );
    let progress = runtime
        .plugins()
        .with_active_tool("importer", |tool: &mut stagehand_plugins::BatchProcessor| {
            tool.processed_batches()
        });
    assert_eq!(progress, Some(4));
}

#[test]
fn configured_tools_replace_the_bundled_set() {
    let (_dir, config) = assets(&[
        (
            "tools.json",
            r#"[
                {"id": "scanner", "class": "probe", "metadata": {"name": "Scanner"}},
                {"id": "ledger", "class": "panel", "metadata": {"name": "Ledger"}, "auto_load": true}
            ]"#,
        ),
        ("ui.json", r#"[{"name": "Tool_Scanner", "widget": "/ui/scanner"}]"#),
    ]);
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().return_const(());
    reporter
        .expect_tool_findings()
        .withf(|report| report.tool_id() == "scanner" && !report.is_valid())
        .times(1)
        .return_const(());
    reporter
        .expect_bootstrap_succeeded()
        .withf(|_, tools| *tools == 2)
        .times(1)
        .return_const(());

    let runtime = bootstrap(config, &reporter).expect("bootstrap");

    assert_eq!(runtime.plugins().available_tools(), ["scanner", "ledger"]);
    assert_eq!(runtime.plugins().cached_tools(), 1);
}

#[test]
fn invalid_log_filters_fail_the_bootstrap() {
    let config = Config {
        log_filter: Some(String::from("stagehand=loud")),
        ..Config::default()
    };
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter.expect_bootstrap_failed().times(1).return_const(());
    reporter.expect_bootstrap_succeeded().never();

    let result = bootstrap(config, &reporter);

    assert!(matches!(result, Err(BootstrapError::Telemetry { .. })));
}
