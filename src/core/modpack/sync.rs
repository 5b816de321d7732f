// ─── Archive Synchronizer ───
// Converges the managed root to the archive named by the active manifest.
// The previous state is only touched once the new archive is fully on disk.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::downloader::Transport;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::with_cache_buster;
use crate::core::instance::{policy, ManagedRoot, PathPolicy};
use crate::core::progress::ProgressSink;

use super::extract::extract_archive;
use super::manifest::{write_record, Manifest};

/// Upper bound for the bulk archive download.
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(120);

/// What a sync attempt converges to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub active: Manifest,
    /// Local record as it was before this attempt.
    pub previous: Option<Manifest>,
    pub update_available: bool,
}

impl SyncPlan {
    /// Only meaningful when a prior record exists.
    pub fn base_version_changed(&self) -> bool {
        self.previous
            .as_ref()
            .is_some_and(|previous| previous.minecraft != self.active.minecraft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Empty source URL: managed content removed (if any).
    Withdrawn,
    /// Nothing to do.
    Unchanged,
    /// Fresh archive downloaded and extracted.
    Installed,
}

pub struct ArchiveSynchronizer {
    root: ManagedRoot,
    transport: Arc<dyn Transport>,
    progress: ProgressSink,
    timeout: Duration,
}

impl ArchiveSynchronizer {
    pub fn new(root: ManagedRoot, transport: Arc<dyn Transport>, progress: ProgressSink) -> Self {
        Self {
            root,
            transport,
            progress,
            timeout: ARCHIVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip_all, fields(version = %plan.active.version))]
    pub async fn converge(&self, plan: &SyncPlan) -> LauncherResult<SyncOutcome> {
        if plan.active.source_url().is_empty() {
            return self.withdraw(&plan.active).await;
        }

        let has_archive = self.root.archive_path().exists();
        let has_mods = self.root.mods_dir().exists();
        if !plan.update_available && has_archive && has_mods {
            debug!("Modpack content present and current, nothing to do");
            return Ok(SyncOutcome::Unchanged);
        }

        if !plan.update_available {
            info!(
                "Repairing modpack content (archive present: {}, mods present: {})",
                has_archive, has_mods
            );
        }
        self.install(plan).await.map_err(LauncherError::sync)?;
        Ok(SyncOutcome::Installed)
    }

    async fn withdraw(&self, manifest: &Manifest) -> LauncherResult<SyncOutcome> {
        if self.root.mods_dir().exists() || self.root.archive_path().exists() {
            self.progress
                .status("Modpack withdrawn, removing managed content...");
            let decision = policy::apply(&self.root, &PathPolicy::withdrawn()).await?;
            info!("Removed {} managed entries", decision.remove.len());
        }
        write_record(&self.root, manifest).await?;
        Ok(SyncOutcome::Withdrawn)
    }

    async fn install(&self, plan: &SyncPlan) -> LauncherResult<()> {
        let manifest = &plan.active;
        tokio::fs::create_dir_all(self.root.path())
            .await
            .map_err(|e| LauncherError::io(self.root.path(), e))?;

        let temp = self.root.archive_temp_path();
        let url = with_cache_buster(
            manifest.source_url(),
            chrono::Utc::now().timestamp_millis(),
        );
        self.progress
            .status(format!("Downloading modpack v{}...", manifest.version));
        if let Err(e) = self
            .transport
            .download_to(&url, &temp, Some(self.timeout))
            .await
        {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial download {:?}: {}", temp, cleanup);
                }
            }
            return Err(e);
        }

        let base_changed = plan.base_version_changed();
        if base_changed {
            info!(
                "Base game version changed to {}, purging versions/",
                manifest.minecraft
            );
        }
        self.progress.status("Cleaning old files...");
        policy::apply(&self.root, &PathPolicy::refresh(base_changed)).await?;

        let archive = self.root.archive_path();
        match tokio::fs::remove_file(&archive).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LauncherError::io(&archive, e)),
        }
        tokio::fs::rename(&temp, &archive)
            .await
            .map_err(|e| LauncherError::io(&archive, e))?;

        self.progress.status("Extracting modpack...");
        let files = extract_archive(&archive, self.root.path()).await?;
        write_record(&self.root, manifest).await?;

        info!("Modpack v{} installed ({} files)", manifest.version, files);
        self.progress
            .status(format!("Modpack v{} installed", manifest.version));
        Ok(())
    }
}
