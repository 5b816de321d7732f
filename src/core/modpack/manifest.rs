// ─── Modpack Manifest ───
// Desired environment state published remotely and the local record of the
// last state converged to.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ManagedRoot;

/// Mod loader declared by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Loader {
    #[default]
    None,
    Fabric(String),
    Forge(String),
}

impl Loader {
    pub fn fabric_version(&self) -> Option<&str> {
        match self {
            Loader::Fabric(version) => Some(version),
            _ => None,
        }
    }

    pub fn forge_version(&self) -> Option<&str> {
        match self {
            Loader::Forge(version) => Some(version),
            _ => None,
        }
    }
}

impl std::fmt::Display for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loader::None => write!(f, "vanilla"),
            Loader::Fabric(version) => write!(f, "fabric (v{version})"),
            Loader::Forge(version) => write!(f, "forge (v{version})"),
        }
    }
}

/// Fully resolved manifest. Compared by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ManifestDocument", into = "ManifestDocument")]
pub struct Manifest {
    pub version: String,
    pub minecraft: String,
    pub loader: Loader,
    /// Source archive URL. Empty means the pack was withdrawn.
    pub url: String,
}

impl Manifest {
    /// Trimmed source URL; the value used for comparisons and downloads.
    pub fn source_url(&self) -> &str {
        self.url.trim()
    }

    /// Version id of the base game descriptor.
    pub fn base_version_id(&self) -> &str {
        &self.minecraft
    }
}

/// Wire shape `{version, minecraft, fabric|forge, url}`. Every field is
/// optional so partial documents can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ManifestDocument {
    fn declares_loader(&self) -> bool {
        self.fabric.is_some() || self.forge.is_some()
    }

    /// Layer `top` over `self` field by field. The loader is one unit: a
    /// document naming either loader replaces both.
    pub fn overlay(mut self, top: &ManifestDocument) -> Self {
        if top.version.is_some() {
            self.version = top.version.clone();
        }
        if top.minecraft.is_some() {
            self.minecraft = top.minecraft.clone();
        }
        if top.declares_loader() {
            self.fabric = top.fabric.clone();
            self.forge = top.forge.clone();
        }
        if top.url.is_some() {
            self.url = top.url.clone();
        }
        self
    }
}

impl From<ManifestDocument> for Manifest {
    fn from(doc: ManifestDocument) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let loader = match (non_empty(doc.fabric), non_empty(doc.forge)) {
            (Some(fabric), _) => Loader::Fabric(fabric),
            (None, Some(forge)) => Loader::Forge(forge),
            (None, None) => Loader::None,
        };
        Self {
            version: doc.version.unwrap_or_default(),
            minecraft: doc.minecraft.unwrap_or_default(),
            loader,
            url: doc.url.unwrap_or_default(),
        }
    }
}

impl From<Manifest> for ManifestDocument {
    fn from(manifest: Manifest) -> Self {
        let (fabric, forge) = match manifest.loader {
            // Explicit empty loader so a vanilla record still overrides defaults.
            Loader::None => (Some(String::new()), None),
            Loader::Fabric(version) => (Some(version), None),
            Loader::Forge(version) => (None, Some(version)),
        };
        Self {
            version: Some(manifest.version),
            minecraft: Some(manifest.minecraft),
            fabric,
            forge,
            url: Some(manifest.url),
        }
    }
}

/// Base64 envelope some hosts wrap file contents in.
#[derive(Debug, Deserialize)]
struct Envelope {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Parse a remote manifest body, unwrapping a base64 envelope if present.
pub fn parse_remote_manifest(body: &[u8]) -> LauncherResult<ManifestDocument> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let is_envelope = value.get("content").is_some_and(|c| c.is_string())
        && value.get("version").is_none();
    if !is_envelope {
        return Ok(serde_json::from_value(value)?);
    }

    let envelope: Envelope = serde_json::from_value(value)?;
    if let Some(encoding) = envelope.encoding.as_deref() {
        if !encoding.eq_ignore_ascii_case("base64") {
            return Err(LauncherError::Fetch(format!(
                "Unsupported manifest encoding: {encoding}"
            )));
        }
    }
    let compact: String = envelope
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let decoded = BASE64_STANDARD.decode(compact)?;
    Ok(serde_json::from_slice(&decoded)?)
}

/// Read the local manifest record. Missing or unreadable records are `None`.
pub async fn read_record(root: &ManagedRoot) -> Option<Manifest> {
    let path = root.manifest_record_path();
    let bytes = tokio::fs::read(&path).await.ok()?;
    match serde_json::from_slice::<Manifest>(&bytes) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("Ignoring unreadable manifest record {:?}: {}", path, e);
            None
        }
    }
}

/// Overwrite the local manifest record (temp file + rename).
pub async fn write_record(root: &ManagedRoot, manifest: &Manifest) -> LauncherResult<()> {
    let path = root.manifest_record_path();
    let staging = path.with_extension("json.tmp");
    let payload = serde_json::to_vec_pretty(manifest)?;

    tokio::fs::create_dir_all(root.path())
        .await
        .map_err(|e| LauncherError::io(root.path(), e))?;
    tokio::fs::write(&staging, payload)
        .await
        .map_err(|e| LauncherError::io(&staging, e))?;
    tokio::fs::rename(&staging, &path)
        .await
        .map_err(|e| LauncherError::io(&path, e))
}
