use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Coarse operating context of the host application.
///
/// The set is closed; new modes are added as enumerants.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Mode {
    /// No mode has been committed yet.
    #[default]
    None,
    /// Front-end menus.
    MainMenu,
    /// Interactive in-world session.
    InGame,
    /// Authoring and editing tools.
    Editor,
    /// Running simulation.
    Runtime,
}

/// Error returned when parsing a [`Mode`] from text fails.
pub type ModeParseError = strum::ParseError;
