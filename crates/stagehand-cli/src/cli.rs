//! Command-line argument definitions for the `stagehand` binary.

use camino::Utf8PathBuf;
use clap::Parser;

/// Drives the Stagehand mode and tool runtime from the command line.
///
/// Without a command, console lines are read from `--script` or standard
/// input until end of input or `quit`.
#[derive(Parser, Debug)]
#[command(name = "stagehand", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Reads console commands from a file instead of standard input.
    #[arg(long, value_name = "PATH")]
    pub(crate) script: Option<Utf8PathBuf>,
    /// Continues with the next command after one fails.
    #[arg(long)]
    pub(crate) keep_going: bool,
    /// A single console command, for example `activate-tool inspector`.
    #[arg(
        value_name = "COMMAND",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) command: Vec<String>,
}

impl Cli {
    /// The one-shot command line, when one was given.
    pub(crate) fn command_line(&self) -> Option<String> {
        (!self.command.is_empty()).then(|| self.command.join(" "))
    }
}
