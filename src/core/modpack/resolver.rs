// ─── Manifest Resolver ───
// Decides whether the local environment must converge to a newer manifest.
// Never fails: an unreachable or malformed remote is treated as "no update".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::downloader::Transport;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ManagedRoot;
use crate::core::progress::ProgressSink;

use super::manifest::{parse_remote_manifest, read_record, write_record, Manifest, ManifestDocument};
use super::sync::SyncPlan;

/// Where manifests come from and what to assume when nothing is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSource {
    pub manifest_url: String,
    /// Pack URL used when neither a local record nor a remote manifest exists.
    #[serde(default)]
    pub fallback_pack_url: String,
    #[serde(default)]
    pub defaults: ManifestDocument,
}

/// True if any compared field differs: version, trimmed url, base game
/// version, fabric loader version. Other fields (forge) are not compared.
pub fn needs_update(local: &Manifest, remote: &Manifest) -> bool {
    local.version != remote.version
        || local.source_url() != remote.source_url()
        || local.minecraft != remote.minecraft
        || local.loader.fabric_version().unwrap_or_default()
            != remote.loader.fabric_version().unwrap_or_default()
}

pub struct ManifestResolver {
    root: ManagedRoot,
    transport: Arc<dyn Transport>,
    source: ManifestSource,
    progress: ProgressSink,
}

impl ManifestResolver {
    pub fn new(
        root: ManagedRoot,
        transport: Arc<dyn Transport>,
        source: ManifestSource,
        progress: ProgressSink,
    ) -> Self {
        Self {
            root,
            transport,
            source,
            progress,
        }
    }

    pub async fn get_local(&self) -> Option<Manifest> {
        read_record(&self.root).await
    }

    pub async fn persist(&self, manifest: &Manifest) -> LauncherResult<()> {
        write_record(&self.root, manifest).await
    }

    /// Fetch and decode the remote manifest document.
    pub async fn fetch_remote(&self) -> LauncherResult<ManifestDocument> {
        let body = self
            .transport
            .fetch_bytes(&self.source.manifest_url)
            .await
            .map_err(|e| LauncherError::Fetch(format!("{}: {e}", self.source.manifest_url)))?;
        parse_remote_manifest(&body)
            .map_err(|e| LauncherError::Fetch(format!("Malformed manifest: {e}")))
    }

    /// The remote manifest if it differs from the local record, else `None`.
    pub async fn check_for_update(&self) -> Option<Manifest> {
        let local = self.get_local().await;
        self.check_against(local.as_ref()).await
    }

    /// Resolve the manifest to converge to for this sync attempt.
    #[instrument(skip(self))]
    pub async fn plan(&self) -> SyncPlan {
        let previous = self.get_local().await;
        let update = self.check_against(previous.as_ref()).await;
        let update_available = update.is_some();
        let active = match update {
            Some(remote) => remote,
            None => self.layer(previous.as_ref(), None),
        };
        debug!(
            "Active manifest v{} ({}, {}) update_available={}",
            active.version, active.minecraft, active.loader, update_available
        );
        SyncPlan {
            active,
            previous,
            update_available,
        }
    }

    async fn check_against(&self, local: Option<&Manifest>) -> Option<Manifest> {
        self.progress.status("Checking modpack version...");
        let remote = match self.fetch_remote().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Manifest check failed: {}", e);
                self.progress
                    .status("Could not check for updates, using local modpack");
                return None;
            }
        };

        let target = self.layer(local, Some(&remote));
        let baseline = local.cloned().unwrap_or_default();
        if needs_update(&baseline, &target) {
            info!(
                "Modpack update: v{} -> v{}",
                baseline.version, target.version
            );
            self.progress
                .status(format!("Update available: v{}", target.version));
            Some(target)
        } else {
            self.progress.status("Modpack is up to date");
            None
        }
    }

    /// `defaults <- local <- remote`, field by field.
    fn layer(&self, local: Option<&Manifest>, remote: Option<&ManifestDocument>) -> Manifest {
        let mut document = self.source.defaults.clone();
        if let Some(local) = local {
            document = document.overlay(&ManifestDocument::from(local.clone()));
        }
        if let Some(remote) = remote {
            document = document.overlay(remote);
        }

        let mut manifest = Manifest::from(document);
        if local.is_none() && remote.is_none() && manifest.source_url().is_empty() {
            manifest.url = self.source.fallback_pack_url.clone();
        }
        manifest
    }
}
