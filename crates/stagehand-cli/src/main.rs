//! Entry point for the `stagehand` binary.
//!
//! The binary delegates to [`stagehand_cli::run`], which loads
//! configuration, boots the runtime and feeds console commands to it.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    stagehand_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
