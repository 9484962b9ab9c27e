//! Unit tests for the CLI session runner.

use std::io::Cursor;

use stagehand_config::Config;

use super::*;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(args: &[&str], input: &str) -> Outcome {
    invoke_with(
        args,
        input,
        &StaticConfigLoader {
            config: Config::default(),
        },
    )
}

fn invoke_with(args: &[&str], input: &str, loader: &impl ConfigLoader) -> Outcome {
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = iter::once("stagehand")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = run_with_loader(
        argv,
        &mut reader,
        &mut stdout,
        &mut stderr,
        loader,
    );
    Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

#[test]
fn one_shot_commands_ignore_standard_input() {
    let outcome = invoke(&["list-tools"], "set-mode in_game\n");

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        outcome.stdout,
        "available tools (3):\n  - inspector [INACTIVE]\n  - minimap [INACTIVE]\n  - importer [INACTIVE]\n"
    );
    assert!(outcome.stderr.is_empty());
}

#[test]
fn standard_input_runs_until_quit() {
    let outcome = invoke(
        &[],
        "# warm up\nset-mode in_game\n\nactivate-tool inspector\nquit\nlist-tools\n",
    );

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, "mode none -> in_game\nactivated inspector\n");
}

#[test]
fn a_failing_command_ends_the_session() {
    let outcome = invoke(&[], "activate-tool ghost\nlist-tools\n");

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(outcome.stderr, "error: tool 'ghost' is not registered\n");
    assert!(outcome.stdout.is_empty());
}

#[test]
fn keep_going_runs_past_failures_but_still_fails() {
    let outcome = invoke(&["--keep-going"], "activate-tool ghost\nlist-tools\n");

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(outcome.stderr, "error: tool 'ghost' is not registered\n");
    assert!(outcome.stdout.starts_with("available tools (3):"));
}

#[test]
fn scripts_are_read_from_disk() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let script = dir.path().join("session.txt");
    std::fs::write(&script, "app-state explore\ntools-for-mode\n").expect("write script");
    let script = script.to_str().expect("utf-8 path");

    let outcome = invoke(&["--script", script], "list-tools\n");

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        outcome.stdout,
        "app state explore; mode none -> in_game\ntools for in_game (3):\n  - inspector\n  - minimap\n  - importer\n"
    );
}

#[test]
fn missing_scripts_are_reported() {
    let outcome = invoke(&["--script", "/nonexistent/stagehand/session.txt"], "");

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.starts_with("failed to read script '/nonexistent/stagehand/session.txt'"));
}

#[test]
fn configuration_errors_are_reported() {
    let outcome = invoke_with(&["--log-format", "yaml", "list-tools"], "", &OrthoConfigLoader);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.starts_with("failed to load configuration"));
    assert!(outcome.stdout.is_empty());
}

#[test]
fn help_is_written_to_stdout() {
    let outcome = invoke(&["--help"], "");

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage: stagehand"));
    assert!(outcome.stderr.is_empty());
}
