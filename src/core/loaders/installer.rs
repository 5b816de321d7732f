use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::LauncherResult;
use crate::core::modpack::Loader;

use super::{context::InstallContext, fabric::FabricInstaller, forge::ForgeInstaller};

/// Outcome of preparing the loader named by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LoaderInstallResult {
    Vanilla,
    /// Loader descriptor `versions/<version_id>/` is in place.
    Fabric { version_id: String },
    /// Installer artifact the launch engine runs itself. `None` if it could
    /// not be fetched.
    Forge {
        installer: Option<PathBuf>,
        version_id: String,
    },
}

impl LoaderInstallResult {
    /// Version the launch engine should start, if it differs from the base.
    pub fn custom_version_id(&self) -> Option<&str> {
        match self {
            LoaderInstallResult::Fabric { version_id } => Some(version_id),
            _ => None,
        }
    }
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult>;
}

/// Static dispatch over the supported loaders.
pub enum Installer {
    Vanilla,
    Fabric(FabricInstaller),
    Forge(ForgeInstaller),
}

impl Installer {
    pub fn new(loader: &Loader) -> Self {
        match loader {
            Loader::None => Self::Vanilla,
            Loader::Fabric(_) => Self::Fabric(FabricInstaller::new()),
            Loader::Forge(_) => Self::Forge(ForgeInstaller::new()),
        }
    }

    pub async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        match self {
            Installer::Vanilla => Ok(LoaderInstallResult::Vanilla),
            Installer::Fabric(i) => i.install(ctx).await,
            Installer::Forge(i) => i.install(ctx).await,
        }
    }
}
