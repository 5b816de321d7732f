// ─── Version Descriptor ───
// Descriptors are rewritten as raw JSON so unknown fields survive; only the
// header fields the sync core inspects are typed.

use std::path::Path;

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};

/// Typed view over the descriptor fields used for validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHeader {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionHeader {
    pub fn from_value(value: &serde_json::Value) -> LauncherResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Declared SHA-1 of the client binary.
    pub fn client_sha1(&self) -> Option<&str> {
        self.downloads
            .as_ref()?
            .client
            .as_ref()?
            .sha1
            .as_deref()
            .filter(|sha| !sha.is_empty())
    }

    pub fn required_java_major(&self) -> Option<u32> {
        self.java_version.as_ref().map(|j| j.major_version)
    }
}

/// Read a descriptor as raw JSON.
pub async fn read_descriptor(path: &Path) -> LauncherResult<serde_json::Value> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Write a descriptor as pretty JSON, creating the version directory.
pub async fn write_descriptor(path: &Path, value: &serde_json::Value) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    let payload = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, payload)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

/// Dedup key of a library coordinate `group:artifact:version[:classifier]`:
/// `group:artifact[:classifier]`. The version is ignored.
pub fn library_key(name: &str) -> String {
    let parts: Vec<&str> = name.split(':').collect();
    match parts.as_slice() {
        [group, artifact, _version, classifier, ..] => {
            format!("{group}:{artifact}:{classifier}")
        }
        [group, artifact, ..] => format!("{group}:{artifact}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_key_drops_version_only() {
        assert_eq!(library_key("org.ow2.asm:asm:9.6"), "org.ow2.asm:asm");
        assert_eq!(
            library_key("org.lwjgl:lwjgl:3.3.3:natives-linux"),
            "org.lwjgl:lwjgl:natives-linux"
        );
        assert_eq!(library_key("weird"), "weird");
    }

    #[test]
    fn header_reads_client_checksum_and_ignores_the_rest() {
        let value = serde_json::json!({
            "id": "1.21.8",
            "downloads": {"client": {"sha1": "abc", "size": 3, "url": "https://x/c.jar"}},
            "javaVersion": {"component": "java-runtime-delta", "majorVersion": 21},
            "somethingNew": [1, 2, 3]
        });
        let header = VersionHeader::from_value(&value).unwrap();
        assert_eq!(header.id.as_deref(), Some("1.21.8"));
        assert_eq!(header.client_sha1(), Some("abc"));
        assert_eq!(header.required_java_major(), Some(21));
    }
}
