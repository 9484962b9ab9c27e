//! JSON data assets read at start-up.
//!
//! Each asset is optional. [`load_asset_or_default`] logs a warning and
//! falls back to `T::default()` when a file is absent or malformed, so a
//! host always starts even with an incomplete asset directory.

use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use strum::{Display, EnumIter};
use thiserror::Error;
use tracing::{debug, warn};

const ASSET_TARGET: &str = "stagehand::config::assets";

/// Data assets recognised by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AssetKind {
    /// Mode registry entries.
    Modes,
    /// Mode transition table.
    Transitions,
    /// Tool descriptors.
    Tools,
    /// Scene registry entries.
    Scenes,
    /// UI widget registry.
    Ui,
}

impl AssetKind {
    /// File name of the asset inside the assets directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Modes => "modes.json",
            Self::Transitions => "transitions.json",
            Self::Tools => "tools.json",
            Self::Scenes => "scenes.json",
            Self::Ui => "ui.json",
        }
    }
}

/// Resolved file locations for every [`AssetKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    root: Utf8PathBuf,
}

impl AssetPaths {
    /// Builds asset locations rooted at `root`.
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Directory containing the assets.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Location of the asset of the given kind.
    #[must_use]
    pub fn path(&self, kind: AssetKind) -> Utf8PathBuf {
        self.root.join(kind.file_name())
    }

    /// Location of the mode registry asset.
    #[must_use]
    pub fn modes(&self) -> Utf8PathBuf {
        self.path(AssetKind::Modes)
    }

    /// Location of the transition table asset.
    #[must_use]
    pub fn transitions(&self) -> Utf8PathBuf {
        self.path(AssetKind::Transitions)
    }

    /// Location of the tool registry asset.
    #[must_use]
    pub fn tools(&self) -> Utf8PathBuf {
        self.path(AssetKind::Tools)
    }

    /// Location of the scene registry asset.
    #[must_use]
    pub fn scenes(&self) -> Utf8PathBuf {
        self.path(AssetKind::Scenes)
    }

    /// Location of the UI registry asset.
    #[must_use]
    pub fn ui(&self) -> Utf8PathBuf {
        self.path(AssetKind::Ui)
    }
}

/// Errors raised while reading a data asset.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// The asset file does not exist.
    #[error("asset '{path}' does not exist")]
    Missing {
        /// Location that was probed.
        path: Utf8PathBuf,
    },
    /// The asset file exists but could not be read.
    #[error("failed to read asset '{path}': {source}")]
    Read {
        /// Location of the asset.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The asset contents are not valid JSON for the expected type.
    #[error("failed to parse asset '{path}': {source}")]
    Parse {
        /// Location of the asset.
        path: Utf8PathBuf,
        /// Underlying decoding error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// Reads and decodes a JSON asset.
///
/// # Errors
///
/// Returns [`AssetError`] when the file is absent, unreadable or malformed.
pub fn try_load_asset<T>(path: &Utf8Path) -> Result<T, AssetError>
where
    T: DeserializeOwned,
{
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            AssetError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            AssetError::Read {
                path: path.to_path_buf(),
                source: Arc::new(source),
            }
        }
    })?;
    serde_json::from_str(&contents).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}

/// Loads an asset, substituting `T::default()` when it cannot be used.
///
/// `paths` may be `None` when no assets directory is configured, in which
/// case the default is returned without touching the file system.
#[must_use]
pub fn load_asset_or_default<T>(paths: Option<&AssetPaths>, kind: AssetKind) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(locations) = paths else {
        debug!(
            target: ASSET_TARGET,
            asset = %kind,
            "no assets directory configured; using defaults"
        );
        return T::default();
    };
    let path = locations.path(kind);
    try_load_asset(&path).map_or_else(
        |error| {
            warn!(
                target: ASSET_TARGET,
                asset = %kind,
                error = %error,
                "asset unavailable; continuing with an empty default"
            );
            T::default()
        },
        |value| {
            debug!(target: ASSET_TARGET, asset = %kind, path = %path, "asset loaded");
            value
        },
    )
}
