// ─── Version Catalog ───
// Public index of base game versions and where their descriptors live.

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::Transport;
use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level version catalog.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(default)]
    pub release_time: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(transport: &dyn Transport, url: &str) -> LauncherResult<Self> {
        info!("Fetching version catalog...");
        let body = transport
            .fetch_bytes(url)
            .await
            .map_err(|e| LauncherError::Fetch(format!("Version catalog: {e}")))?;
        let manifest: VersionManifest = serde_json::from_slice(&body)?;
        info!("Loaded {} versions from catalog", manifest.versions.len());
        Ok(manifest)
    }

    /// Exact id match (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_catalog_entry() {
        let json = r#"{
            "id": "1.20.4",
            "type": "release",
            "releaseTime": "2023-12-07T08:00:00+00:00",
            "url": "https://example.com/1.20.4.json",
            "sha1": "abc123"
        }"#;
        let entry: VersionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "1.20.4");
        assert_eq!(entry.version_type, "release");
        assert_eq!(entry.release_time.as_deref(), Some("2023-12-07T08:00:00+00:00"));
    }

    #[test]
    fn find_version_requires_exact_id() {
        let manifest: VersionManifest = serde_json::from_value(serde_json::json!({
            "versions": [
                {"id": "1.21.8", "type": "release", "url": "https://x/1.21.8.json"},
                {"id": "1.21.8-rc1", "type": "snapshot", "url": "https://x/rc1.json"}
            ]
        }))
        .unwrap();
        assert_eq!(manifest.find_version("1.21.8").unwrap().url, "https://x/1.21.8.json");
        assert!(manifest.find_version("1.21").is_none());
    }
}
