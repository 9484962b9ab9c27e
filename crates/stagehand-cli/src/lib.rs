//! Command-line runtime for Stagehand.
//!
//! [`run`] separates configuration flags from the command arguments, loads
//! the layered configuration, boots the runtime and then feeds console lines
//! to it: a single command given on the command line, the lines of a
//! `--script` file, or standard input. Output is written to the supplied
//! streams so the runtime can be exercised from tests.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::iter;
use std::process::ExitCode;

use clap::Parser;
use stagehand_plugins::Console;

mod bootstrap;
mod builtin;
mod cli;
mod config;
mod errors;
mod health;
mod telemetry;

pub use bootstrap::{BootstrapError, Runtime, bootstrap};
use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Tracing target for runtime wiring and the console session.
pub const CLI_TARGET: &str = "stagehand::cli";

const QUIT_COMMANDS: &[&str] = &["quit", "exit"];

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    run_with_loader(args, input, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, R, W, E, L>(
    args: I,
    input: &mut R,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);

    let result = Cli::try_parse_from(split.command_arguments(&arguments))
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            loader
                .load(&split.config_arguments)
                .map(|config| (cli, config))
        })
        .and_then(|(cli, config)| {
            let script = open_script(&cli)?;
            let reporter = StructuredHealthReporter::new();
            let runtime = bootstrap(config, &reporter)?;
            let mut session = Session::new(runtime.console(), cli.keep_going);
            let outcome = match (cli.command_line(), script) {
                (Some(line), _) => session.run(iter::once(Ok(line)), stdout, stderr),
                (None, Some(reader)) => session.run(reader.lines(), stdout, stderr),
                (None, None) => session.run(input.lines(), stdout, stderr),
            };
            reporter.session_finished(session.executed, session.failed);
            runtime.shutdown().map_err(AppError::Shutdown)?;
            outcome
        });

    match result {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            report(stdout, &error);
            ExitCode::SUCCESS
        }
        Err(error) => {
            report(stderr, &error);
            ExitCode::FAILURE
        }
    }
}

fn open_script(cli: &Cli) -> Result<Option<BufReader<File>>, AppError> {
    let Some(path) = cli.script.as_ref() else {
        return Ok(None);
    };
    let file = File::open(path).map_err(|source| AppError::ReadScript {
        path: path.clone(),
        source,
    })?;
    Ok(Some(BufReader::new(file)))
}

fn report(sink: &mut impl Write, message: &impl std::fmt::Display) {
    if let Err(error) = writeln!(sink, "{message}") {
        tracing::error!(target: CLI_TARGET, event = "report_failed", error = %error);
    }
}

struct Session<'a> {
    console: &'a Console,
    keep_going: bool,
    executed: usize,
    failed: usize,
}

impl<'a> Session<'a> {
    const fn new(console: &'a Console, keep_going: bool) -> Self {
        Self {
            console,
            keep_going,
            executed: 0,
            failed: 0,
        }
    }

    fn run<W, E>(
        &mut self,
        lines: impl Iterator<Item = io::Result<String>>,
        stdout: &mut W,
        stderr: &mut E,
    ) -> Result<ExitCode, AppError>
    where
        W: Write,
        E: Write,
    {
        for read in lines {
            let text = read.map_err(AppError::ReadInput)?;
            let command = text.trim();
            if QUIT_COMMANDS.contains(&command) {
                break;
            }
            if command.is_empty() || command.starts_with('#') {
                continue;
            }
            self.executed += 1;
            match self.console.execute(command) {
                Ok(output) => {
                    if !output.is_empty() {
                        writeln!(stdout, "{output}").map_err(AppError::WriteOutput)?;
                    }
                }
                Err(error) => {
                    self.failed += 1;
                    writeln!(stderr, "error: {error}").map_err(AppError::WriteOutput)?;
                    if !self.keep_going {
                        break;
                    }
                }
            }
        }
        stdout.flush().map_err(AppError::WriteOutput)?;
        Ok(if self.failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

#[cfg(test)]
mod tests;
