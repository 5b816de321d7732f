// ─── Reconciliation Orchestrator ───
// Sequences manifest check, archive sync, loader install, descriptor repair
// and runtime provisioning for one managed root.
//
// At most one sync runs per orchestrator. Later callers attach to the
// in-flight attempt and observe its result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::core::auth::LauncherProfile;
use crate::core::downloader::Transport;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ManagedRoot;
use crate::core::java::{required_java_for_minecraft_version, RuntimeProvisioner};
use crate::core::launch::{LaunchConfig, LaunchEngine};
use crate::core::loaders::{InstallContext, Installer, LoaderInstallResult};
use crate::core::modpack::{ArchiveSynchronizer, Loader, Manifest, ManifestResolver};
use crate::core::progress::ProgressSink;
use crate::core::version::reconcile::DescriptorReconciler;
use crate::core::version::version_file::{read_descriptor, VersionHeader};

use super::settings::LauncherSettings;

type SharedSync = Shared<BoxFuture<'static, Result<Manifest, Arc<LauncherError>>>>;

pub struct Orchestrator {
    root: ManagedRoot,
    transport: Arc<dyn Transport>,
    settings: LauncherSettings,
    progress: ProgressSink,
    in_flight: Mutex<Option<SharedSync>>,
}

impl Orchestrator {
    pub fn new(
        root: ManagedRoot,
        transport: Arc<dyn Transport>,
        settings: LauncherSettings,
        progress: ProgressSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            root,
            transport,
            settings,
            progress,
            in_flight: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &ManagedRoot {
        &self.root
    }

    pub async fn is_syncing(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    /// Converge the managed root to the active manifest and return it.
    ///
    /// The attempt runs on its own task and clears the in-flight marker
    /// however it ends, even if every caller goes away. A panic inside the
    /// attempt is reported as an error.
    pub async fn sync(self: &Arc<Self>) -> LauncherResult<Manifest> {
        let attempt = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    info!("Sync already in progress, waiting for it...");
                    existing.clone()
                }
                None => {
                    let this = Arc::clone(self);
                    let task = tokio::spawn(async move {
                        let result = this.run_caught().await.map_err(Arc::new);
                        this.in_flight.lock().await.take();
                        result
                    });
                    let attempt: SharedSync = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(Arc::new(LauncherError::Other(format!(
                                "Sync task failed: {e}"
                            ))))
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };
        attempt.await.map_err(LauncherError::Shared)
    }

    /// `run_sync` with a panic turned into an error.
    async fn run_caught(&self) -> LauncherResult<Manifest> {
        AssertUnwindSafe(self.run_sync())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!("Sync attempt panicked: {}", message);
                Err(LauncherError::Other(format!(
                    "Sync attempt panicked: {message}"
                )))
            })
    }

    #[instrument(skip(self), fields(root = ?self.root.path()))]
    async fn run_sync(&self) -> LauncherResult<Manifest> {
        self.root.ensure_exists().await?;

        let resolver = ManifestResolver::new(
            self.root.clone(),
            Arc::clone(&self.transport),
            self.settings.manifest_source(),
            self.progress.clone(),
        );
        let plan = resolver.plan().await;
        info!(
            "Resolved versions: MC={}, loader={}, pack={}, url={:?}",
            plan.active.minecraft,
            plan.active.loader,
            plan.active.version,
            plan.active.source_url()
        );

        let outcome = ArchiveSynchronizer::new(
            self.root.clone(),
            Arc::clone(&self.transport),
            self.progress.clone(),
        )
        .with_timeout(self.settings.archive_timeout())
        .converge(&plan)
        .await?;
        debug!("Archive sync outcome: {:?}", outcome);
        Ok(plan.active)
    }

    /// Sync, install the loader, repair descriptors and provision the runtime.
    pub async fn prepare_launch(
        self: &Arc<Self>,
        profile: LauncherProfile,
    ) -> LauncherResult<LaunchConfig> {
        self.prepare(profile).await.map(|(_, config)| config)
    }

    async fn prepare(
        self: &Arc<Self>,
        profile: LauncherProfile,
    ) -> LauncherResult<(Manifest, LaunchConfig)> {
        let manifest = self.sync().await?;
        info!("Detected loader: {}", manifest.loader);

        let runtime = RuntimeProvisioner::new(&self.root, Arc::clone(&self.transport));
        let loader_version = match &manifest.loader {
            Loader::Fabric(version) | Loader::Forge(version) => version.as_str(),
            Loader::None => "",
        };
        let install = Installer::new(&manifest.loader)
            .install(InstallContext {
                minecraft_version: &manifest.minecraft,
                loader_version,
                root: &self.root,
                transport: self.transport.as_ref(),
                runtime: &runtime,
                progress: &self.progress,
            })
            .await?;

        if let LoaderInstallResult::Fabric { version_id } = &install {
            DescriptorReconciler::new(self.root.clone(), Arc::clone(&self.transport))
                .reconcile(manifest.base_version_id(), version_id)
                .await;
        }

        self.progress.status("Checking Java Runtime...");
        let java = runtime.ensure(self.java_major_for(&manifest).await).await?;

        let config = LaunchConfig::build(
            self.root.path(),
            java,
            &manifest,
            &install,
            &self.settings.launch_options(),
            profile,
        );
        Ok((manifest, config))
    }

    /// Declared by the base descriptor when present, else derived from the id.
    async fn java_major_for(&self, manifest: &Manifest) -> u32 {
        let declared = read_descriptor(&self.root.descriptor_path(manifest.base_version_id()))
            .await
            .ok()
            .and_then(|value| VersionHeader::from_value(&value).ok())
            .and_then(|header| header.required_java_major());
        declared.unwrap_or_else(|| required_java_for_minecraft_version(&manifest.minecraft))
    }

    /// Prepare and hand the configuration to `engine`. Failures are reported
    /// as a status line before being returned.
    pub async fn launch(
        self: &Arc<Self>,
        engine: &dyn LaunchEngine,
        profile: LauncherProfile,
    ) -> LauncherResult<()> {
        let (manifest, config) = match self.prepare(profile).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Launch preparation failed: {}", e);
                self.progress.status(e.status_message());
                return Err(e);
            }
        };

        self.progress.status(format!(
            "Launching Minecraft {} ({})...",
            manifest.minecraft, manifest.loader
        ));
        if let Err(e) = engine.launch(&config, self.progress.clone()).await {
            error!("Launch error: {}", e);
            self.progress.status(format!("Launch Error: {e}"));
            return Err(e);
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
