use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Name of the persisted local manifest record.
pub const MANIFEST_RECORD_FILE: &str = "modpack-info.json";
/// Name of the retained copy of the bulk archive.
pub const ARCHIVE_FILE: &str = "modpack.zip";
/// Scratch name the archive is downloaded to before replacing `ARCHIVE_FILE`.
pub const ARCHIVE_TEMP_FILE: &str = "modpack_temp.zip";

/// On-disk directory tree owned by the sync core for one game instance.
///
/// Layout:
/// - `runtime/`, `java/`, `libraries/`, `assets/`: retained infrastructure
/// - `versions/<id>/<id>.{json,jar}`: version descriptors
/// - `mods/`, `config/`, packs...: managed content shipped by the archive
/// - `modpack.zip`: copy of the last converged archive
/// - `modpack-info.json`: local manifest record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRoot {
    path: PathBuf,
}

impl ManagedRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the `mods/` directory, the managed-content marker.
    pub fn mods_dir(&self) -> PathBuf {
        self.path.join("mods")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.path.join("versions")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.path.join("runtime")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.path.join(ARCHIVE_FILE)
    }

    pub fn archive_temp_path(&self) -> PathBuf {
        self.path.join(ARCHIVE_TEMP_FILE)
    }

    pub fn manifest_record_path(&self) -> PathBuf {
        self.path.join(MANIFEST_RECORD_FILE)
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    /// `versions/<id>/<id>.json`
    pub fn descriptor_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{version_id}.json"))
    }

    /// `versions/<id>/<id>.jar`
    pub fn version_jar_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join(format!("{version_id}.jar"))
    }

    /// Cached installer artifact for a loader family (`fabric`, `forge`).
    pub fn installer_path(&self, family: &str) -> PathBuf {
        self.path.join(format!("{family}-installer.jar"))
    }

    pub async fn ensure_exists(&self) -> LauncherResult<()> {
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_paths_follow_versions_layout() {
        let root = ManagedRoot::new("/games/pack");
        assert_eq!(
            root.descriptor_path("1.21.8"),
            PathBuf::from("/games/pack/versions/1.21.8/1.21.8.json")
        );
        assert_eq!(
            root.version_jar_path("fabric-loader-0.18.4-1.21.8"),
            PathBuf::from(
                "/games/pack/versions/fabric-loader-0.18.4-1.21.8/fabric-loader-0.18.4-1.21.8.jar"
            )
        );
    }

    #[test]
    fn installer_path_is_named_by_family() {
        let root = ManagedRoot::new("/games/pack");
        assert_eq!(
            root.installer_path("forge"),
            PathBuf::from("/games/pack/forge-installer.jar")
        );
    }
}
