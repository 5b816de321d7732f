use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::core::downloader::Transport;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ManagedRoot;

use super::paths::{ArchiveKind, Platform};

/// Downloads and unpacks Java runtimes into `<root>/runtime/java<major>`.
///
/// Validity is existence of the executable only; no version probe.
pub struct RuntimeProvisioner {
    runtime_root: PathBuf,
    platform: Platform,
    transport: Arc<dyn Transport>,
}

impl RuntimeProvisioner {
    pub fn new(root: &ManagedRoot, transport: Arc<dyn Transport>) -> Self {
        Self::with_platform(root, transport, Platform::current())
    }

    pub fn with_platform(
        root: &ManagedRoot,
        transport: Arc<dyn Transport>,
        platform: Platform,
    ) -> Self {
        Self {
            runtime_root: root.runtime_dir(),
            platform,
            transport,
        }
    }

    pub fn install_dir(&self, major: u32) -> PathBuf {
        self.runtime_root.join(format!("java{major}"))
    }

    /// Already-present executable for `major`, without touching the network.
    pub async fn installed(&self, major: u32) -> Option<PathBuf> {
        locate_java(self.install_dir(major), self.platform.clone()).await
    }

    /// Ensure a runtime for `major` exists and return its executable.
    #[instrument(skip(self))]
    pub async fn ensure(&self, major: u32) -> LauncherResult<PathBuf> {
        if let Some(existing) = self.installed(major).await {
            debug!("Java {} already present at {:?}", major, existing);
            return Ok(existing);
        }

        info!(
            "Java {} not found under {:?}, provisioning for {}",
            major,
            self.install_dir(major),
            self.platform
        );
        self.provision(major)
            .await
            .map_err(|e| match e {
                err @ LauncherError::Provision(_) => err,
                other => LauncherError::Provision(other.to_string()),
            })
    }

    async fn provision(&self, major: u32) -> LauncherResult<PathBuf> {
        let install_dir = self.install_dir(major);
        if install_dir.exists() {
            tokio::fs::remove_dir_all(&install_dir)
                .await
                .map_err(|e| LauncherError::io(&install_dir, e))?;
        }
        tokio::fs::create_dir_all(&install_dir)
            .await
            .map_err(|e| LauncherError::io(&install_dir, e))?;

        let url = self.platform.runtime_download_url(major).ok_or_else(|| {
            LauncherError::Provision(format!("Unsupported platform/arch: {}", self.platform))
        })?;
        let archive_path = self.runtime_root.join(self.platform.archive_name());

        let download_start = Instant::now();
        info!("Downloading JDK from {}", url);
        self.transport.download_to(&url, &archive_path, None).await?;
        info!(
            "Runtime download finished in {:?}",
            download_start.elapsed()
        );

        let kind = self.platform.archive_kind();
        let archive = archive_path.clone();
        let dest = install_dir.clone();
        tokio::task::spawn_blocking(move || extract::extract_runtime(&archive, &dest, kind))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))??;

        tokio::fs::remove_file(&archive_path)
            .await
            .map_err(|e| LauncherError::io(&archive_path, e))?;

        let java_bin = locate_java(install_dir.clone(), self.platform.clone())
            .await
            .ok_or_else(|| {
                LauncherError::Provision(format!(
                    "Java executable not found after extraction in {:?}",
                    install_dir
                ))
            })?;

        if kind == ArchiveKind::TarGz {
            mark_executable(&java_bin)?;
        }

        info!("Java {} ready at {:?}", major, java_bin);
        Ok(java_bin)
    }
}

/// Expected location first, then a full search. Runs off the async runtime.
async fn locate_java(install_dir: PathBuf, platform: Platform) -> Option<PathBuf> {
    tokio::task::spawn_blocking(move || {
        let expected = platform.expected_java_path(&install_dir);
        if expected.is_file() {
            return Some(expected);
        }
        find_java_binary(&install_dir, platform.java_exe())
    })
    .await
    .ok()
    .flatten()
}

/// Breadth-first search for `bin/<exe>` below `root`. Symlinked
/// directories are not descended into.
///
/// Archives usually nest everything under a versioned top-level folder
/// (`jdk-17.0.9+9/`), so the location is not known up front.
pub fn find_java_binary(root: &Path, exe: &str) -> Option<PathBuf> {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(current) = queue.pop_front() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        let mut children = entries
            .filter_map(Result::ok)
            .filter_map(|entry| Some((entry.path(), entry.file_type().ok()?)))
            .collect::<Vec<_>>();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (child, file_type) in children {
            if child.file_name().and_then(|n| n.to_str()) == Some("bin") {
                let candidate = child.join(exe);
                if candidate.is_file() {
                    return Some(candidate);
                }
            } else if file_type.is_dir() {
                queue.push_back(child);
            }
        }
    }
    None
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| LauncherError::io(path, e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| LauncherError::io(path, e))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> LauncherResult<()> {
    Ok(())
}

/// Base game version → Java major the game needs.
pub fn required_java_for_minecraft_version(minecraft_version: &str) -> u32 {
    let lower = minecraft_version.to_ascii_lowercase();
    if let Some(week_pos) = lower.find('w') {
        let year_hint = &lower[..week_pos];
        // Last two characters, on a char boundary.
        let year_suffix = year_hint
            .char_indices()
            .rev()
            .nth(1)
            .map(|(start, _)| &year_hint[start..]);
        if let Some(Ok(snapshot_year)) = year_suffix.map(str::parse::<u32>) {
            if snapshot_year >= 24 {
                return 21;
            }
            return 17;
        }
    }

    let mut parts = minecraft_version.split('.');
    let major = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1);
    let minor = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(20);
    let patch = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(0);

    if major > 1 || minor >= 21 || (minor == 20 && patch >= 5) {
        21
    } else if minor >= 17 {
        17
    } else {
        8
    }
}

mod extract {
    use std::path::{Component, Path, PathBuf};

    use flate2::read::GzDecoder;

    use super::ArchiveKind;
    use crate::core::error::{LauncherError, LauncherResult};

    pub fn extract_runtime(archive: &Path, dest: &Path, kind: ArchiveKind) -> LauncherResult<()> {
        match kind {
            ArchiveKind::Zip => extract_zip(archive, dest),
            ArchiveKind::TarGz => extract_tar_gz(archive, dest),
        }
    }

    fn extract_zip(archive_path: &Path, dest: &Path) -> LauncherResult<()> {
        let file = std::fs::File::open(archive_path)
            .map_err(|e| LauncherError::io(archive_path, e))?;
        let mut archive = zip::ZipArchive::new(file)?;

        for index in 0..archive.len() {
            let mut zipped = archive.by_index(index)?;
            let Some(enclosed) = zipped.enclosed_name() else {
                return Err(LauncherError::Provision(format!(
                    "Invalid zip entry path: {}",
                    zipped.name()
                )));
            };
            let out_path = dest.join(normalized(&enclosed));

            if zipped.is_dir() {
                std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
            }
            let mut out =
                std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            std::io::copy(&mut zipped, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
        }
        Ok(())
    }

    fn extract_tar_gz(archive_path: &Path, dest: &Path) -> LauncherResult<()> {
        let file = std::fs::File::open(archive_path)
            .map_err(|e| LauncherError::io(archive_path, e))?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive.set_preserve_permissions(true);
        archive
            .unpack(dest)
            .map_err(|e| LauncherError::io(dest, e))
    }

    fn normalized(path: &Path) -> PathBuf {
        path.components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::java::paths::OsFamily;
    use crate::core::test_support::{tar_gz_bytes, zip_bytes, FakeTransport};

    const LINUX_URL: &str =
        "https://api.adoptium.net/v3/binary/latest/17/ga/linux/x64/jdk/hotspot/normal/eclipse";

    fn linux() -> Platform {
        Platform::new(OsFamily::Linux, "x86_64")
    }

    #[tokio::test]
    async fn existing_executable_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let transport = Arc::new(FakeTransport::new());
        let provisioner = RuntimeProvisioner::with_platform(&root, transport.clone(), linux());

        let java = provisioner.install_dir(17).join("bin").join("java");
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"#!/bin/sh").unwrap();

        assert_eq!(provisioner.ensure(17).await.unwrap(), java);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn nested_tarball_is_located_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let transport = Arc::new(FakeTransport::new());
        transport.route(
            LINUX_URL,
            tar_gz_bytes(&[
                ("jdk-17.0.9+9/bin/java", b"#!/bin/sh"),
                ("jdk-17.0.9+9/release", b"JAVA_VERSION=17"),
            ]),
        );
        let provisioner = RuntimeProvisioner::with_platform(&root, transport.clone(), linux());

        let java = provisioner.ensure(17).await.unwrap();
        assert!(java.ends_with("java17/jdk-17.0.9+9/bin/java"));
        assert!(!root.runtime_dir().join("java.tar.gz").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&java).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        assert_eq!(provisioner.ensure(17).await.unwrap(), java);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn windows_zip_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let transport = Arc::new(FakeTransport::new());
        transport.route(
            "https://api.adoptium.net/v3/binary/latest/21/ga/windows/x64/jdk/hotspot/normal/eclipse",
            zip_bytes(&[("jdk-21/bin/java.exe", b"MZ")]),
        );
        let provisioner = RuntimeProvisioner::with_platform(
            &root,
            transport,
            Platform::new(OsFamily::Windows, "x86_64"),
        );

        let java = provisioner.ensure(21).await.unwrap();
        assert!(java.ends_with("jdk-21/bin/java.exe"));
    }

    #[tokio::test]
    async fn missing_executable_after_extraction_is_provision_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let transport = Arc::new(FakeTransport::new());
        transport.route(LINUX_URL, tar_gz_bytes(&[("jdk/README", b"no java here")]));
        let provisioner = RuntimeProvisioner::with_platform(&root, transport, linux());

        assert!(matches!(
            provisioner.ensure(17).await,
            Err(LauncherError::Provision(_))
        ));
    }

    #[tokio::test]
    async fn unsupported_arch_is_provision_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let provisioner = RuntimeProvisioner::with_platform(
            &root,
            Arc::new(FakeTransport::new()),
            Platform::new(OsFamily::Linux, "riscv64"),
        );

        assert!(matches!(
            provisioner.ensure(17).await,
            Err(LauncherError::Provision(_))
        ));
    }

    #[test]
    fn java_required_by_minecraft_version() {
        assert_eq!(required_java_for_minecraft_version("1.16.5"), 8);
        assert_eq!(required_java_for_minecraft_version("1.20.4"), 17);
        assert_eq!(required_java_for_minecraft_version("1.20.5"), 21);
        assert_eq!(required_java_for_minecraft_version("1.21.8"), 21);
        assert_eq!(required_java_for_minecraft_version("24w14a"), 21);
        assert_eq!(required_java_for_minecraft_version("23w31a"), 17);
    }

    #[test]
    fn non_ascii_version_does_not_panic() {
        assert_eq!(required_java_for_minecraft_version("éxw1"), 17);
        assert_eq!(required_java_for_minecraft_version("éw1"), 17);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("jdk").join("loop");
        std::fs::create_dir_all(&nested).unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("back")).unwrap();

        assert_eq!(find_java_binary(dir.path(), "java"), None);

        let java = dir.path().join("jdk").join("bin").join("java");
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"").unwrap();
        assert_eq!(find_java_binary(dir.path(), "java"), Some(java));
    }

    #[tokio::test]
    async fn installed_checks_expected_location() {
        let dir = tempfile::tempdir().unwrap();
        let root = ManagedRoot::new(dir.path());
        let provisioner =
            RuntimeProvisioner::with_platform(&root, Arc::new(FakeTransport::new()), linux());
        assert_eq!(provisioner.installed(21).await, None);

        let java = provisioner.install_dir(21).join("bin").join("java");
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"").unwrap();
        assert_eq!(provisioner.installed(21).await, Some(java));
    }
}
