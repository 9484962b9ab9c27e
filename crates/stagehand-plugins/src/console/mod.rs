//! Text commands for driving the framework interactively.
//!
//! Each line is a command name followed by whitespace-separated arguments.
//! [`Console::execute`] returns the text to show the operator.

use std::rc::Rc;
use std::time::Duration;

use stagehand_modes::{AppState, AppStateController, Mode, TransitionError, TransitionOutcome};
use stagehand_services::ManualScheduler;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use tracing::{debug, warn};

use crate::PLUGIN_TARGET;
use crate::batch::BatchProcessor;
use crate::error::PluginError;
use crate::manager::PluginManager;

/// Commands understood by the [`Console`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ConsoleCommand {
    /// Activate a tool by id.
    ActivateTool,
    /// Deactivate a tool by id.
    DeactivateTool,
    /// List available tools with their state.
    ListTools,
    /// Request a mode change.
    SetMode,
    /// Apply an application state.
    AppState,
    /// List tools usable in the current mode.
    ToolsForMode,
    /// Validate a registered tool.
    ValidateTool,
    /// Start the run of an active batch processor.
    StartBatch,
    /// Advance the scheduler clock.
    Tick,
    /// Show the command list.
    Help,
}

impl ConsoleCommand {
    /// Argument synopsis.
    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            Self::ActivateTool | Self::DeactivateTool | Self::ValidateTool | Self::StartBatch => {
                "<tool-id>"
            }
            Self::SetMode => "<mode>",
            Self::AppState => "<state>",
            Self::Tick => "<milliseconds>",
            Self::ListTools | Self::ToolsForMode | Self::Help => "",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::ActivateTool => "activate a tool",
            Self::DeactivateTool => "deactivate a tool",
            Self::ListTools => "list available tools",
            Self::SetMode => "request a mode change",
            Self::AppState => "apply an application state",
            Self::ToolsForMode => "list tools usable in the current mode",
            Self::ValidateTool => "validate a registered tool",
            Self::StartBatch => "start an active batch processor",
            Self::Tick => "advance the scheduler clock",
            Self::Help => "show this help",
        }
    }
}

/// Errors reported for a console line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command name is not recognised.
    #[error("unknown command '{command}'; try 'help'")]
    Unknown {
        /// Name as typed.
        command: String,
    },

    /// A required argument is missing.
    #[error("usage: {command} {usage}")]
    MissingArgument {
        /// Command that was run.
        command: ConsoleCommand,
        /// Expected arguments.
        usage: &'static str,
    },

    /// An argument could not be parsed.
    #[error("invalid {kind} '{value}'")]
    InvalidArgument {
        /// What was expected.
        kind: &'static str,
        /// Value as typed.
        value: String,
    },

    /// The tool was not active.
    #[error("tool '{id}' is not active")]
    NotActive {
        /// Requested tool id.
        id: String,
    },

    /// The tool is active but not a batch processor, or already running.
    #[error("tool '{id}' cannot start a batch run")]
    NotStartable {
        /// Requested tool id.
        id: String,
    },

    /// No tool is registered under this id.
    #[error("tool '{id}' is not registered")]
    UnknownTool {
        /// Requested tool id.
        id: String,
    },

    /// The plugin manager rejected the request.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The mode manager rejected the request.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Interprets console lines against a running framework.
pub struct Console {
    plugins: Rc<PluginManager>,
    app_state: Rc<AppStateController>,
    clock: Rc<ManualScheduler>,
}

impl Console {
    /// Creates a console.
    #[must_use]
    pub const fn new(
        plugins: Rc<PluginManager>,
        app_state: Rc<AppStateController>,
        clock: Rc<ManualScheduler>,
    ) -> Self {
        Self {
            plugins,
            app_state,
            clock,
        }
    }

    /// Runs one line. Blank lines and `#` comments produce no output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the line cannot be run.
    pub fn execute(&self, line: &str) -> Result<String, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next().filter(|word| !word.starts_with('#')) else {
            return Ok(String::new());
        };
        let command: ConsoleCommand = name.parse().map_err(|_| CommandError::Unknown {
            command: name.to_owned(),
        })?;
        let argument = words.next();
        debug!(target: PLUGIN_TARGET, event = "console_command", command = %command, argument);
        let output = self.dispatch(command, argument);
        if let Err(error) = &output {
            warn!(target: PLUGIN_TARGET, event = "console_command_failed", command = %command, error = %error);
        }
        output
    }

    fn dispatch(&self, command: ConsoleCommand, argument: Option<&str>) -> Result<String, CommandError> {
        let required = || {
            argument.ok_or_else(|| CommandError::MissingArgument {
                command,
                usage: command.usage(),
            })
        };
        match command {
            ConsoleCommand::ActivateTool => {
                let id = required()?;
                self.plugins.activate_tool(id)?;
                Ok(format!("activated {id}"))
            }
            ConsoleCommand::DeactivateTool => {
                let id = required()?;
                if self.plugins.deactivate_tool(id) {
                    Ok(format!("deactivated {id}"))
                } else {
                    Err(CommandError::NotActive { id: id.to_owned() })
                }
            }
            ConsoleCommand::ListTools => Ok(self.list_tools()),
            ConsoleCommand::SetMode => self.set_mode(required()?),
            ConsoleCommand::AppState => self.apply_state(required()?),
            ConsoleCommand::ToolsForMode => Ok(self.tools_for_mode()),
            ConsoleCommand::ValidateTool => self.validate(required()?),
            ConsoleCommand::StartBatch => self.start_batch(required()?),
            ConsoleCommand::Tick => self.tick(required()?),
            ConsoleCommand::Help => Ok(help()),
        }
    }

    fn list_tools(&self) -> String {
        let tools = self.plugins.available_tools();
        let mut lines = vec![format!("available tools ({}):", tools.len())];
        lines.extend(tools.iter().map(|id| {
            let state = if self.plugins.is_tool_active(id) {
                "ACTIVE"
            } else {
                "INACTIVE"
            };
            format!("  - {id} [{state}]")
        }));
        lines.join("\n")
    }

    fn tools_for_mode(&self) -> String {
        let mode = self.plugins.current_mode();
        let tools = self.plugins.tools_for_current_mode();
        let mut lines = vec![format!("tools for {mode} ({}):", tools.len())];
        lines.extend(tools.iter().map(|id| format!("  - {id}")));
        lines.join("\n")
    }

    fn set_mode(&self, value: &str) -> Result<String, CommandError> {
        let mode: Mode = value.parse().map_err(|_| CommandError::InvalidArgument {
            kind: "mode",
            value: value.to_owned(),
        })?;
        let outcome = self.plugins.context().modes().set_mode(mode)?;
        Ok(describe(outcome))
    }

    fn apply_state(&self, value: &str) -> Result<String, CommandError> {
        let state: AppState = value.parse().map_err(|_| CommandError::InvalidArgument {
            kind: "app state",
            value: value.to_owned(),
        })?;
        let Some(outcome) = self.app_state.apply(state) else {
            return Ok(format!("app state {state}; mode unchanged"));
        };
        Ok(format!("app state {state}; {}", describe(outcome?)))
    }

    fn validate(&self, id: &str) -> Result<String, CommandError> {
        let report = self
            .plugins
            .validate_tool(id)
            .ok_or_else(|| CommandError::UnknownTool { id: id.to_owned() })?;
        let verdict = if report.is_valid() { "valid" } else { "invalid" };
        let mut lines = vec![format!(
            "{id}: {verdict} ({} errors, {} warnings)",
            report.error_count(),
            report.warning_count()
        )];
        lines.extend(report.issues().iter().map(|issue| format!("  {issue}")));
        Ok(lines.join("\n"))
    }

    fn start_batch(&self, id: &str) -> Result<String, CommandError> {
        if !self.plugins.is_tool_active(id) {
            return Err(CommandError::NotActive { id: id.to_owned() });
        }
        let started = self
            .plugins
            .with_active_tool(id, BatchProcessor::start_processing)
            .unwrap_or(false);
        if started {
            Ok(format!("started {id}"))
        } else {
            Err(CommandError::NotStartable { id: id.to_owned() })
        }
    }

    fn tick(&self, value: &str) -> Result<String, CommandError> {
        let millis: u64 = value.parse().map_err(|_| CommandError::InvalidArgument {
            kind: "duration",
            value: value.to_owned(),
        })?;
        let fired = self.clock.advance(Duration::from_millis(millis));
        Ok(format!("advanced {millis} ms; {fired} timers fired"))
    }
}

fn describe(outcome: TransitionOutcome) -> String {
    match outcome {
        TransitionOutcome::Committed(change) => format!("mode {} -> {}", change.from, change.to),
        TransitionOutcome::Deferred { target } => format!("mode change to {target} queued"),
    }
}

fn help() -> String {
    let mut lines = vec![String::from("commands:")];
    for command in ConsoleCommand::iter() {
        lines.push(format!("  {command} {}", command.usage()).trim_end().to_owned());
        lines.push(format!("      {}", command.summary()));
    }
    lines.join("\n")
}
