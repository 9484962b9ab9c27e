//! Integration tests for the `stagehand` binary entry point.
//!
//! Drives a console session through standard input and checks the exit
//! status and user-facing output.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

#[test]
fn one_shot_command_lists_bundled_tools() {
    let mut command = cargo_bin_cmd!("stagehand");
    command.env("STAGEHAND_LOG_FILTER", "off");
    command.arg("list-tools");
    command
        .assert()
        .success()
        .stdout(contains("available tools (3):").and(contains("inspector [INACTIVE]")));
}

#[test]
fn piped_session_runs_a_batch_to_completion() {
    let mut command = cargo_bin_cmd!("stagehand");
    command.env("STAGEHAND_LOG_FILTER", "off");
    command.args(["--batch-interval-ms", "50"]);
    command.write_stdin("activate-tool importer\nstart-batch importer\ntick 500\nquit\n");
    command
        .assert()
        .success()
        .stdout(contains("started importer").and(contains("advanced 500 ms; 5 timers fired")));
}

#[test]
fn unknown_commands_exit_with_failure() {
    let mut command = cargo_bin_cmd!("stagehand");
    command.env("STAGEHAND_LOG_FILTER", "off");
    command.arg("teleport");
    command
        .assert()
        .failure()
        .stderr(contains("unknown command 'teleport'"));
}

#[test]
fn invalid_log_filters_abort_start_up() {
    let mut command = cargo_bin_cmd!("stagehand");
    command.args(["--log-filter", "stagehand=loud", "list-tools"]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to initialise telemetry"));
}

#[test]
fn scripts_and_asset_directories_are_honoured() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("tools.json"),
        r#"[{"id": "ledger", "class": "panel", "metadata": {"name": "Ledger", "supported_modes": ["editor"]}}]"#,
    )?;
    let script = dir.path().join("session.txt");
    std::fs::write(&script, "set-mode main_menu\nset-mode editor\ntools-for-mode\n")?;

    let mut command = cargo_bin_cmd!("stagehand");
    command.env("STAGEHAND_LOG_FILTER", "off");
    command.arg("--assets-dir").arg(dir.path());
    command.arg("--script").arg(&script);
    command.assert().success().stdout(contains(
        "mode main_menu -> editor\ntools for editor (1):\n  - ledger",
    ));
    Ok(())
}
