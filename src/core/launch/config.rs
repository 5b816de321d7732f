// ─── Launch Configuration ───
// Terminal output of the sync core: everything the external launch engine
// needs to start the game, serialized in the shape it expects.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::auth::LauncherProfile;
use crate::core::loaders::LoaderInstallResult;
use crate::core::modpack::Manifest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    pub root: PathBuf,
    pub java_path: PathBuf,
    pub version: VersionSelector,
    pub memory: MemoryBounds,
    /// Forge installer the engine runs before the first launch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forge: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderPointer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_play: Option<QuickPlay>,
    pub authorization: LauncherProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSelector {
    pub number: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Descriptor id to start instead of `number`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

/// JVM heap bounds in the engine's notation (`"2G"`, `"512M"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBounds {
    pub min: String,
    pub max: String,
}

impl Default for MemoryBounds {
    fn default() -> Self {
        Self {
            min: "2G".into(),
            max: "4G".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderPointer {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
}

/// Join a world or server directly after start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickPlay {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

impl QuickPlay {
    pub fn multiplayer(host: &str, port: u16) -> Self {
        Self {
            kind: "multiplayer".into(),
            identifier: format!("{host}:{port}"),
        }
    }
}

/// Per-installation launch preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub memory: MemoryBounds,
    pub quick_play: Option<QuickPlay>,
}

impl LaunchConfig {
    pub fn build(
        root: &Path,
        java_path: PathBuf,
        manifest: &Manifest,
        install: &LoaderInstallResult,
        options: &LaunchOptions,
        authorization: LauncherProfile,
    ) -> Self {
        let custom = install.custom_version_id().map(str::to_string);
        let (forge, loader) = match install {
            LoaderInstallResult::Forge {
                installer,
                version_id,
            } => (
                installer.clone(),
                Some(LoaderPointer {
                    kind: "forge".into(),
                    version: version_id.clone(),
                }),
            ),
            // The fabric descriptor is already standalone; the engine must
            // not try to install the loader again.
            LoaderInstallResult::Fabric { .. } | LoaderInstallResult::Vanilla => (None, None),
        };

        Self {
            root: root.to_path_buf(),
            java_path,
            version: VersionSelector {
                number: custom
                    .clone()
                    .unwrap_or_else(|| manifest.minecraft.clone()),
                kind: "release".into(),
                custom,
            },
            memory: options.memory.clone(),
            forge,
            loader,
            quick_play: options.quick_play.clone(),
            authorization,
        }
    }
}
