//! Directed graph of permitted mode transitions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use stagehand_config::{AssetKind, AssetPaths, load_asset_or_default};

use crate::mode::Mode;

/// Maps a source mode to the set of modes directly reachable from it.
///
/// A source mode without an entry may move to any other mode. A source with
/// an entry may only move to the listed targets. Moving to the current mode
/// is never a transition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ModeTransitionTable {
    routes: BTreeMap<Mode, BTreeSet<Mode>>,
}

impl Default for ModeTransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ModeTransitionTable {
    /// Table with no entries; every transition between distinct modes is
    /// permitted.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Built-in table used when no transition asset is supplied.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with_routes(Mode::MainMenu, [Mode::InGame, Mode::Editor])
            .with_routes(Mode::InGame, [Mode::MainMenu, Mode::Runtime])
            .with_routes(Mode::Editor, [Mode::MainMenu])
            .with_routes(Mode::Runtime, [Mode::InGame])
    }

    /// Loads the transition asset, falling back to [`Self::standard`].
    #[must_use]
    pub fn from_assets(paths: Option<&AssetPaths>) -> Self {
        load_asset_or_default(paths, AssetKind::Transitions)
    }

    /// Replaces the targets reachable from `from`.
    #[must_use]
    pub fn with_routes(mut self, from: Mode, targets: impl IntoIterator<Item = Mode>) -> Self {
        self.set_routes(from, targets);
        self
    }

    /// Replaces the targets reachable from `from`.
    pub fn set_routes(&mut self, from: Mode, targets: impl IntoIterator<Item = Mode>) {
        self.routes.insert(from, targets.into_iter().collect());
    }

    /// Removes the entry for `from`, making it permissive again.
    pub fn clear_routes(&mut self, from: Mode) -> bool {
        self.routes.remove(&from).is_some()
    }

    /// Returns the explicit targets for `from`, if any are listed.
    #[must_use]
    pub fn targets(&self, from: Mode) -> Option<&BTreeSet<Mode>> {
        self.routes.get(&from)
    }

    /// Returns `true` when `from` has an explicit entry.
    #[must_use]
    pub fn has_entry(&self, from: Mode) -> bool {
        self.routes.contains_key(&from)
    }

    /// Decides whether `from` may move directly to `to`.
    #[must_use]
    pub fn allows(&self, from: Mode, to: Mode) -> bool {
        if from == to {
            return false;
        }
        self.routes
            .get(&from)
            .is_none_or(|targets| targets.contains(&to))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn unlisted_sources_permit_every_other_mode() {
        let table = ModeTransitionTable::empty();
        for from in Mode::iter() {
            for to in Mode::iter().filter(|to| *to != from) {
                assert!(table.allows(from, to), "{from} -> {to} should be allowed");
            }
        }
    }

    #[test]
    fn listed_sources_permit_only_their_targets() {
        let table = ModeTransitionTable::standard();
        for from in Mode::iter().filter(|mode| table.has_entry(*mode)) {
            let targets = table.targets(from).expect("entry exists");
            for to in Mode::iter() {
                let expected = to != from && targets.contains(&to);
                assert_eq!(table.allows(from, to), expected, "{from} -> {to}");
            }
        }
    }

    #[rstest]
    #[case::empty(ModeTransitionTable::empty())]
    #[case::standard(ModeTransitionTable::standard())]
    fn self_transitions_are_rejected(#[case] table: ModeTransitionTable) {
        for mode in Mode::iter() {
            assert!(!table.allows(mode, mode));
        }
    }

    #[test]
    fn none_is_unlisted_in_the_standard_table() {
        let table = ModeTransitionTable::standard();
        assert!(table.allows(Mode::None, Mode::Runtime));
        assert!(!table.allows(Mode::MainMenu, Mode::Runtime));
    }

    #[test]
    fn decodes_from_json_map() {
        let table: ModeTransitionTable =
            serde_json::from_str(r#"{"editor":["main_menu","runtime"]}"#).expect("decode table");

        assert!(table.allows(Mode::Editor, Mode::Runtime));
        assert!(!table.allows(Mode::Editor, Mode::InGame));
        assert!(table.allows(Mode::InGame, Mode::Editor));
    }

    #[test]
    fn clearing_routes_restores_permissive_default() {
        let mut table = ModeTransitionTable::standard();
        assert!(table.clear_routes(Mode::Editor));
        assert!(table.allows(Mode::Editor, Mode::Runtime));
    }
}
