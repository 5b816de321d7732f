use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::installer::{LoaderInstallResult, LoaderInstaller};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::required_java_for_minecraft_version;

const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";

/// One entry of the installer listing, newest first.
#[derive(Debug, Deserialize)]
pub struct InstallerEntry {
    pub url: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Runs the official fabric installer against the managed root.
pub struct FabricInstaller {
    meta_base: String,
}

impl Default for FabricInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl FabricInstaller {
    pub fn new() -> Self {
        Self {
            meta_base: FABRIC_META_BASE.to_string(),
        }
    }

    pub fn with_meta_base(meta_base: impl Into<String>) -> Self {
        Self {
            meta_base: meta_base.into(),
        }
    }

    /// `fabric-loader-<loader>-<minecraft>`
    pub fn version_id(minecraft_version: &str, loader_version: &str) -> String {
        format!("fabric-loader-{loader_version}-{minecraft_version}")
    }

    fn installer_args(
        installer: &Path,
        root: &Path,
        minecraft_version: &str,
        loader_version: &str,
    ) -> Vec<OsString> {
        vec![
            "-jar".into(),
            installer.into(),
            "client".into(),
            "-dir".into(),
            root.into(),
            "-mcversion".into(),
            minecraft_version.into(),
            "-loader".into(),
            loader_version.into(),
            "-noprofile".into(),
        ]
    }

    /// Cached by existence: a present jar is never re-downloaded.
    async fn ensure_installer_jar(&self, ctx: &InstallContext<'_>) -> LauncherResult<PathBuf> {
        let path = ctx.root.installer_path("fabric");
        if path.exists() {
            debug!("Using cached fabric installer {:?}", path);
            return Ok(path);
        }

        let listing_url = format!("{}/versions/installer", self.meta_base);
        let body = ctx.transport.fetch_bytes(&listing_url).await?;
        let entries: Vec<InstallerEntry> = serde_json::from_slice(&body)?;
        let latest = entries
            .first()
            .ok_or_else(|| LauncherError::Install("Fabric installer listing is empty".into()))?;

        info!(
            "Downloading fabric installer {} from {}",
            latest.version.as_deref().unwrap_or("?"),
            latest.url
        );
        // Only a complete download may land on the cached name.
        let partial = path.with_extension("jar.part");
        if let Err(e) = ctx.transport.download_to(&latest.url, &partial, None).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {:?}: {}", partial, cleanup);
                }
            }
            return Err(e);
        }
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        Ok(path)
    }

    async fn run_installer(java: &Path, args: &[OsString]) -> LauncherResult<()> {
        debug!("Running {:?} {:?}", java, args);
        let output = tokio::process::Command::new(java)
            .args(args)
            .output()
            .await
            .map_err(|e| LauncherError::Install(format!("Failed to start installer: {e}")))?;

        if !output.status.success() {
            return Err(LauncherError::Install(format!(
                "Fabric installer failed (code {:?})\nSTDOUT:\n{}\nSTDERR:\n{}",
                output.status.code(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        let version_id = Self::version_id(ctx.minecraft_version, ctx.loader_version);
        let descriptor = ctx.root.descriptor_path(&version_id);
        if descriptor.exists() {
            debug!("{} already installed, skipping installer", version_id);
            return Ok(LoaderInstallResult::Fabric { version_id });
        }

        info!(
            "Installing Fabric {} for Minecraft {}",
            ctx.loader_version, ctx.minecraft_version
        );
        ctx.progress.status("Installing Fabric Loader...");

        let installer = self.ensure_installer_jar(&ctx).await.map_err(|e| match e {
            err @ LauncherError::Install(_) => err,
            other => LauncherError::Install(format!("Fabric installer download: {other}")),
        })?;
        let java = ctx
            .runtime
            .ensure(required_java_for_minecraft_version(ctx.minecraft_version))
            .await?;

        let args = Self::installer_args(
            &installer,
            ctx.root.path(),
            ctx.minecraft_version,
            ctx.loader_version,
        );
        Self::run_installer(&java, &args).await?;

        if !descriptor.exists() {
            return Err(LauncherError::Install(format!(
                "Installer finished but {:?} is missing",
                descriptor
            )));
        }

        info!("Fabric installed successfully");
        ctx.progress.status("Fabric Installed.");
        Ok(LoaderInstallResult::Fabric { version_id })
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

    const MC: &str = "1.21.8";
    const LOADER: &str = "0.18.4";

    async fn install(root: &ManagedRoot, transport: Arc<FakeTransport>) -> LauncherResult<LoaderInstallResult> {
        let runtime = RuntimeProvisioner::new(root, transport.clone());
        let progress = ProgressSink::disconnected();
        FabricInstaller::with_meta_base("https://meta.test/v2")
            .install(InstallContext {
                minecraft_version: MC,
                loader_version: LOADER,
                root,
                transport: transport.as_ref(),
                runtime: &runtime,
                progress: &progress,
            })
            .await
    }

    #[test]
    fn installer_command_line() {
        let args = FabricInstaller::installer_args(
            Path::new("/r/fabric-installer.jar"),
            Path::new("/r"),
            MC,
            LOADER,
        );
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            [
                "-jar",
                "/r/fabric-installer.jar",
                "client",
                "-dir",
                "/r",
                "-mcversion",
                "1.21.8",
                "-loader",
                "0.18.4",
                "-noprofile"
            ]
        );
    }

    #[tokio::test]
    async fn existing_descriptor_skips_installer() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let id = FabricInstaller::version_id(MC, LOADER);
        std::fs::create_dir_all(root.version_dir(&id)).unwrap();
        std::fs::write(root.descriptor_path(&id), b"{}").unwrap();
        let transport = Arc::new(FakeTransport::new());

        let result = install(&root, transport.clone()).await.unwrap();

        assert_eq!(result, LoaderInstallResult::Fabric { version_id: id });
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_meta_is_an_install_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());

        let err = install(&root, Arc::new(FakeTransport::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Install(_)), "{err:?}");
    }

    #[tokio::test]
    async fn interrupted_installer_download_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let transport = Arc::new(FakeTransport::new());
        transport.route(
            "https://meta.test/v2/versions/installer",
            r#"[{"url":"https://maven.test/fabric-installer-1.1.0.jar","version":"1.1.0"}]"#,
        );
        transport.route_truncated(
            "https://maven.test/fabric-installer-1.1.0.jar",
            b"PK\x03".to_vec(),
        );

        let err = install(&root, transport.clone()).await.unwrap_err();
        assert!(matches!(err, LauncherError::Install(_)), "{err:?}");
        assert!(!root.installer_path("fabric").exists());
        assert!(!root.installer_path("fabric").with_extension("jar.part").exists());

        // A retry goes back to the listing instead of reusing a broken jar.
        install(&root, transport.clone()).await.unwrap_err();
        assert_eq!(transport.hits("https://meta.test/v2/versions/installer"), 2);
        assert_eq!(transport.hits("https://maven.test/fabric-installer-1.1.0.jar"), 2);
    }

    #[cfg(target_os = "linux")]
    fn fake_java(root: &ManagedRoot, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let java = root.runtime_dir().join("java21").join("bin").join("java");
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, script).unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn runs_installer_with_provisioned_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        // $5 = -dir, $7 = -mcversion, $9 = -loader
        fake_java(
            &root,
            "#!/bin/sh\nid=\"fabric-loader-$9-$7\"\nmkdir -p \"$5/versions/$id\"\necho '{}' > \"$5/versions/$id/$id.json\"\n",
        );
        let transport = Arc::new(FakeTransport::new());
        transport.route(
            "https://meta.test/v2/versions/installer",
            r#"[{"url":"https://maven.test/fabric-installer-1.1.0.jar","version":"1.1.0","stable":true}]"#,
        );
        transport.route("https://maven.test/fabric-installer-1.1.0.jar", b"jar".to_vec());

        let result = install(&root, transport.clone()).await.unwrap();

        let id = FabricInstaller::version_id(MC, LOADER);
        assert_eq!(result, LoaderInstallResult::Fabric { version_id: id.clone() });
        assert!(root.descriptor_path(&id).exists());
        assert!(root.installer_path("fabric").exists());
        assert_eq!(transport.request_count(), 2);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failing_installer_is_an_install_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        fake_java(&root, "#!/bin/sh\necho boom >&2\nexit 3\n");
        std::fs::write(root.installer_path("fabric"), b"jar").unwrap();
        let transport = Arc::new(FakeTransport::new());

        let err = install(&root, transport.clone()).await.unwrap_err();

        match err {
            LauncherError::Install(message) => assert!(message.contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.request_count(), 0);
    }
}
