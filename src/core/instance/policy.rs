// ─── Retain / Purge Policy ───
// Declarative rules deciding which top-level entries of the managed root
// survive a convergence. Pure: evaluated on names, no filesystem access.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::model::{ManagedRoot, ARCHIVE_FILE, ARCHIVE_TEMP_FILE, MANIFEST_RECORD_FILE};
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAction {
    Retain,
    Purge,
}

/// A rule matching one top-level entry name exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    pub name: String,
    pub action: PathAction,
}

/// Ordered rule list; the first matching rule wins, unmatched entries are purged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPolicy {
    rules: Vec<PathRule>,
}

/// Result of evaluating a policy against a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    pub keep: Vec<PathBuf>,
    pub remove: Vec<PathBuf>,
}

const INFRASTRUCTURE: [&str; 4] = ["libraries", "assets", "runtime", "java"];

impl PathPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(mut self, name: &str) -> Self {
        self.rules.push(PathRule {
            name: name.to_string(),
            action: PathAction::Retain,
        });
        self
    }

    pub fn purge(mut self, name: &str) -> Self {
        self.rules.push(PathRule {
            name: name.to_string(),
            action: PathAction::Purge,
        });
        self
    }

    /// Policy for a withdrawn pack (empty source URL): everything but
    /// infrastructure, descriptors and the manifest record goes, including
    /// the archive copy.
    pub fn withdrawn() -> Self {
        INFRASTRUCTURE
            .iter()
            .fold(Self::new().retain("versions"), |policy, name| {
                policy.retain(name)
            })
            .retain(MANIFEST_RECORD_FILE)
    }

    /// Policy applied before extracting a fresh archive. `versions/` only
    /// survives when the base game version is unchanged.
    pub fn refresh(base_version_changed: bool) -> Self {
        let policy = INFRASTRUCTURE
            .iter()
            .fold(Self::new(), |policy, name| policy.retain(name))
            .retain(MANIFEST_RECORD_FILE)
            .retain(ARCHIVE_FILE)
            .retain(ARCHIVE_TEMP_FILE);
        if base_version_changed {
            policy.purge("versions")
        } else {
            policy.retain("versions")
        }
    }

    pub fn action_for(&self, name: &str) -> PathAction {
        self.rules
            .iter()
            .find(|rule| rule.name == name)
            .map(|rule| rule.action)
            .unwrap_or(PathAction::Purge)
    }

    /// Split `paths` into kept and removed entries by their final component.
    pub fn decide<P: AsRef<Path>>(&self, paths: &[P]) -> Decision {
        let mut decision = Decision::default();
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match self.action_for(&name) {
                PathAction::Retain => decision.keep.push(path.to_path_buf()),
                PathAction::Purge => decision.remove.push(path.to_path_buf()),
            }
        }
        decision
    }
}

/// Top-level entries of the managed root.
pub async fn list_entries(root: &ManagedRoot) -> LauncherResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(root.path()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LauncherError::io(root.path(), e)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(root.path(), e))?
    {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Apply `policy` to the managed root, deleting every purged entry.
///
/// Individual deletion failures are logged and skipped so one locked file
/// does not abort the whole wipe.
pub async fn apply(root: &ManagedRoot, policy: &PathPolicy) -> LauncherResult<Decision> {
    let decision = policy.decide(&list_entries(root).await?);
    for path in &decision.remove {
        debug!("Purging {:?}", path);
        if let Err(source) = remove_path(path).await {
            warn!("Failed to purge {:?}: {}", path, source);
        }
    }
    Ok(decision)
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    let metadata = tokio::fs::symlink_metadata(path).await?;
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}
