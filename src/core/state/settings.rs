use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ManagedRoot;
use crate::core::launch::{LaunchOptions, MemoryBounds, QuickPlay};
use crate::core::modpack::sync::ARCHIVE_TIMEOUT;
use crate::core::modpack::{ManifestDocument, ManifestSource};

pub const APP_DIR_NAME: &str = "PackSync";
pub const SETTINGS_FILE: &str = "launcher_settings.json";
const BOOTSTRAP_FILE: &str = "launcher_bootstrap.json";
const INSTANCE_DIR_NAME: &str = "minecraft_instance";

const DEFAULT_MANIFEST_URL: &str = "https://example.com/packsync/modpack-manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LauncherSettings {
    pub manifest_url: String,
    /// Pack used on a fresh install when the manifest cannot be reached.
    pub fallback_pack_url: String,
    /// Lowest layer of the active manifest.
    pub default_manifest: ManifestDocument,
    pub memory: MemoryBounds,
    pub quick_play: Option<QuickPlay>,
    /// Upper bound for the modpack archive download, in seconds.
    pub archive_timeout_secs: u64,
}

/// Points the launcher at a data dir outside the default location.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BootstrapConfig {
    data_dir: PathBuf,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.into(),
            fallback_pack_url: String::new(),
            default_manifest: ManifestDocument {
                version: Some("1.0.0".into()),
                minecraft: Some("1.21.8".into()),
                fabric: Some("0.18.4".into()),
                forge: None,
                url: Some(String::new()),
            },
            memory: MemoryBounds::default(),
            quick_play: None,
            archive_timeout_secs: ARCHIVE_TIMEOUT.as_secs(),
        }
    }
}

impl LauncherSettings {
    /// Settings stored in `data_dir`; missing or invalid files yield defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Invalid settings at {:?}, using defaults: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| LauncherError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
    }

    pub fn manifest_source(&self) -> ManifestSource {
        ManifestSource {
            manifest_url: self.manifest_url.clone(),
            fallback_pack_url: self.fallback_pack_url.clone(),
            defaults: self.default_manifest.clone(),
        }
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_secs.max(1))
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            memory: self.memory.clone(),
            quick_play: self.quick_play.clone(),
        }
    }
}

/// Managed root of the single game instance inside `data_dir`.
pub fn instance_root(data_dir: &Path) -> ManagedRoot {
    ManagedRoot::new(data_dir.join(INSTANCE_DIR_NAME))
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_data_dir() -> PathBuf {
    data_dir_in(&default_base_dir())
}

/// `<base>/PackSync`, unless a bootstrap file in `base` redirects it.
fn data_dir_in(base: &Path) -> PathBuf {
    let bootstrap_path = base.join(BOOTSTRAP_FILE);
    if let Ok(raw) = std::fs::read_to_string(&bootstrap_path) {
        match serde_json::from_str::<BootstrapConfig>(&raw) {
            Ok(cfg) => return cfg.data_dir,
            Err(e) => warn!("Ignoring invalid bootstrap file {:?}: {}", bootstrap_path, e),
        }
    }
    base.join(APP_DIR_NAME)
}
