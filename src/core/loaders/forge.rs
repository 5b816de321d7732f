use std::path::PathBuf;

use tracing::{info, warn};

use super::context::InstallContext;
use super::installer::{LoaderInstallResult, LoaderInstaller};
use crate::core::error::LauncherResult;

const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";

/// Fetches the forge installer jar; running it is left to the launch engine.
pub struct ForgeInstaller {
    maven_base: String,
}

impl Default for ForgeInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl ForgeInstaller {
    pub fn new() -> Self {
        Self {
            maven_base: FORGE_MAVEN.to_string(),
        }
    }

    /// `<minecraft>-<forge>`
    pub fn version_id(minecraft_version: &str, loader_version: &str) -> String {
        format!("{minecraft_version}-{loader_version}")
    }

    pub fn installer_url(&self, forge_id: &str) -> String {
        format!(
            "{}/net/minecraftforge/forge/{forge_id}/forge-{forge_id}-installer.jar",
            self.maven_base
        )
    }
}

#[async_trait::async_trait]
impl LoaderInstaller for ForgeInstaller {
    /// A failed download is reported but does not abort: the engine may still
    /// find an installed forge version.
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        let version_id = Self::version_id(ctx.minecraft_version, ctx.loader_version);
        let installer_path = ctx.root.installer_path("forge");
        if installer_path.exists() {
            return Ok(LoaderInstallResult::Forge {
                installer: Some(installer_path),
                version_id,
            });
        }

        ctx.progress.status("Downloading Forge Installer...");
        let url = self.installer_url(&version_id);
        info!("Downloading forge installer {}", url);
        let installer: Option<PathBuf> =
            match ctx.transport.download_to(&url, &installer_path, None).await {
                Ok(_) => Some(installer_path),
                Err(e) => {
                    warn!("Forge installer download failed: {}", e);
                    ctx.progress
                        .status(format!("Forge Download Failed: {e}"));
                    if let Err(cleanup) = tokio::fs::remove_file(&installer_path).await {
                        if cleanup.kind() != std::io::ErrorKind::NotFound {
                            warn!("Failed to remove {:?}: {}", installer_path, cleanup);
                        }
                    }
                    None
                }
            };

        Ok(LoaderInstallResult::Forge {
            installer,
            version_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::instance::ManagedRoot;
    use crate::core::java::RuntimeProvisioner;
    use crate::core::progress::ProgressSink;
    use crate::core::test_support::FakeTransport;

    async fn install(
        root: &ManagedRoot,
        transport: Arc<FakeTransport>,
        progress: &ProgressSink,
    ) -> LoaderInstallResult {
        let runtime = RuntimeProvisioner::new(root, transport.clone());
        ForgeInstaller::new()
            .install(InstallContext {
                minecraft_version: "1.20.1",
                loader_version: "47.2.0",
                root,
                transport: transport.as_ref(),
                runtime: &runtime,
                progress,
            })
            .await
            .unwrap()
    }

    #[test]
    fn installer_url_template() {
        assert_eq!(
            ForgeInstaller::new().installer_url("1.20.1-47.2.0"),
            "https://maven.minecraftforge.net/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-installer.jar"
        );
    }

    #[tokio::test]
    async fn downloads_once_and_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let transport = Arc::new(FakeTransport::new());
        let url = ForgeInstaller::new().installer_url("1.20.1-47.2.0");
        transport.route(&url, b"installer".to_vec());
        let progress = ProgressSink::disconnected();

        for _ in 0..2 {
            let result = install(&root, transport.clone(), &progress).await;
            assert_eq!(
                result,
                LoaderInstallResult::Forge {
                    installer: Some(root.installer_path("forge")),
                    version_id: "1.20.1-47.2.0".into(),
                }
            );
        }
        assert_eq!(transport.hits(&url), 1);
    }

    #[tokio::test]
    async fn failed_download_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let (progress, mut rx) = ProgressSink::channel();

        let result = install(&root, Arc::new(FakeTransport::new()), &progress).await;

        assert!(matches!(result, LoaderInstallResult::Forge { installer: None, .. }));
        assert!(!root.installer_path("forge").exists());
        let mut messages = Vec::new();
        while let Ok(crate::core::progress::ProgressEvent::Status { message }) = rx.try_recv() {
            messages.push(message);
        }
        assert!(messages.iter().any(|m| m.starts_with("Forge Download Failed")));
    }
}
