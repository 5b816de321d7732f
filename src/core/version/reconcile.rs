// ─── Descriptor Reconciler ───
// Turns a loader descriptor that inherits from a base descriptor into a
// standalone one, repairing the base along the way. Every step is
// best-effort: failures are collected as warnings and the next step runs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::core::downloader::{sha1_file, Transport};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ManagedRoot;

use super::manifest::{VersionManifest, VERSION_MANIFEST_URL};
use super::version_file::{library_key, read_descriptor, write_descriptor, VersionHeader};

/// Fields copied from the parent when the child does not declare them.
const INHERITED_IF_ABSENT: [&str; 4] = ["assetIndex", "mainClass", "assets", "javaVersion"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    ValidateParent,
    AcquireParent,
    VerifyChecksum,
    Merge,
    MirrorBinary,
}

/// Non-fatal failure of one reconcile step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileWarning {
    pub step: ReconcileStep,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub parent_removed: bool,
    pub parent_downloaded: bool,
    pub jar_removed: bool,
    pub child_rewritten: bool,
    pub jar_mirrored: bool,
    pub warnings: Vec<ReconcileWarning>,
}

impl ReconcileReport {
    /// Whether any step changed the filesystem.
    pub fn wrote_anything(&self) -> bool {
        self.parent_removed
            || self.parent_downloaded
            || self.jar_removed
            || self.child_rewritten
            || self.jar_mirrored
    }

    fn record<T: Default>(&mut self, step: ReconcileStep, result: LauncherResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!("Descriptor reconcile step {:?} failed: {}", step, e);
                self.warnings.push(ReconcileWarning {
                    step,
                    message: e.to_string(),
                });
                T::default()
            }
        }
    }
}

pub struct DescriptorReconciler {
    root: ManagedRoot,
    transport: Arc<dyn Transport>,
    catalog_url: String,
}

impl DescriptorReconciler {
    pub fn new(root: ManagedRoot, transport: Arc<dyn Transport>) -> Self {
        Self {
            root,
            transport,
            catalog_url: VERSION_MANIFEST_URL.to_string(),
        }
    }

    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    /// Repair the base descriptor `minecraft` and make `child_id` standalone.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, minecraft: &str, child_id: &str) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        report.parent_removed =
            report.record(ReconcileStep::ValidateParent, self.validate_parent(minecraft).await);
        report.parent_downloaded =
            report.record(ReconcileStep::AcquireParent, self.acquire_parent(minecraft).await);
        report.jar_removed =
            report.record(ReconcileStep::VerifyChecksum, self.verify_checksum(minecraft).await);
        report.child_rewritten =
            report.record(ReconcileStep::Merge, self.merge(minecraft, child_id).await);
        report.jar_mirrored = report.record(
            ReconcileStep::MirrorBinary,
            self.mirror_binary(minecraft, child_id).await,
        );

        if report.warnings.is_empty() {
            debug!("Descriptor {} reconciled against {}", child_id, minecraft);
        } else {
            warn!(
                "Descriptor {} reconciled with {} warning(s)",
                child_id,
                report.warnings.len()
            );
        }
        report
    }

    /// Delete the parent descriptor if it is unreadable or names another id.
    async fn validate_parent(&self, minecraft: &str) -> LauncherResult<bool> {
        let path = self.root.descriptor_path(minecraft);
        if !path.exists() {
            return Ok(false);
        }

        let declared = match read_descriptor(&path).await {
            Ok(value) => VersionHeader::from_value(&value).ok().and_then(|h| h.id),
            Err(e) => {
                warn!("Unreadable base descriptor {:?}: {}", path, e);
                None
            }
        };
        if declared.as_deref() == Some(minecraft) {
            return Ok(false);
        }

        warn!(
            "Base descriptor {:?} declares id {:?}, expected {}. Removing.",
            path, declared, minecraft
        );
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        Ok(true)
    }

    /// Download the parent descriptor from the public catalog if absent.
    async fn acquire_parent(&self, minecraft: &str) -> LauncherResult<bool> {
        let path = self.root.descriptor_path(minecraft);
        if path.exists() {
            return Ok(false);
        }

        info!("Base descriptor {} missing, fetching from catalog", minecraft);
        let catalog = VersionManifest::fetch(self.transport.as_ref(), &self.catalog_url).await?;
        let entry = catalog.find_version(minecraft).ok_or_else(|| {
            LauncherError::Fetch(format!("Version {minecraft} not found in catalog"))
        })?;
        let body = self
            .transport
            .fetch_bytes(&entry.url)
            .await
            .map_err(|e| LauncherError::Fetch(format!("Descriptor {minecraft}: {e}")))?;
        let descriptor: Value = serde_json::from_slice(&body)?;
        write_descriptor(&path, &descriptor).await?;
        Ok(true)
    }

    /// Delete the base jar if its SHA-1 disagrees with the descriptor.
    async fn verify_checksum(&self, minecraft: &str) -> LauncherResult<bool> {
        let jar = self.root.version_jar_path(minecraft);
        let descriptor = self.root.descriptor_path(minecraft);
        if !jar.exists() || !descriptor.exists() {
            return Ok(false);
        }

        let header = VersionHeader::from_value(&read_descriptor(&descriptor).await?)?;
        let Some(expected) = header.client_sha1() else {
            return Ok(false);
        };
        let actual = sha1_file(&jar).await?;
        if actual.eq_ignore_ascii_case(expected) {
            return Ok(false);
        }

        warn!(
            "Checksum mismatch for {:?} (expected {}, got {}). Removing.",
            jar, expected, actual
        );
        tokio::fs::remove_file(&jar)
            .await
            .map_err(|e| LauncherError::io(&jar, e))?;
        Ok(true)
    }

    async fn merge(&self, minecraft: &str, child_id: &str) -> LauncherResult<bool> {
        let child_path = self.root.descriptor_path(child_id);
        let parent_path = self.root.descriptor_path(minecraft);
        if !child_path.exists() || !parent_path.exists() {
            return Ok(false);
        }

        let child = read_descriptor(&child_path).await?;
        if child.get("inheritsFrom").is_none() {
            debug!("{} is already standalone", child_id);
            return Ok(false);
        }
        let parent = read_descriptor(&parent_path).await?;

        let merged = merge_descriptors(&child, &parent);
        if merged == child {
            return Ok(false);
        }
        write_descriptor(&child_path, &merged).await?;
        let libraries = merged
            .get("libraries")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!("Merged {} into {} ({} libraries)", minecraft, child_id, libraries);
        Ok(true)
    }

    /// Copy the base jar next to the child descriptor if it has none.
    async fn mirror_binary(&self, minecraft: &str, child_id: &str) -> LauncherResult<bool> {
        let child_dir = self.root.version_dir(child_id);
        let child_jar = self.root.version_jar_path(child_id);
        let parent_jar = self.root.version_jar_path(minecraft);
        if !child_dir.is_dir() || child_jar.exists() || !parent_jar.exists() {
            return Ok(false);
        }

        copy(&parent_jar, &child_jar).await?;
        info!("Mirrored {:?} to {:?}", parent_jar, child_jar);
        Ok(true)
    }
}

async fn copy(from: &Path, to: &Path) -> LauncherResult<()> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| LauncherError::io(to, e))
}

/// Child-first library merge deduplicated by [`library_key`]; the first
/// entry seen for a key wins.
pub fn merge_libraries(child: &[Value], parent: &[Value]) -> Vec<Value> {
    let mut seen = HashSet::new();
    child
        .iter()
        .chain(parent)
        .filter(|lib| match lib.get("name").and_then(Value::as_str) {
            Some(name) => seen.insert(library_key(name)),
            None => true,
        })
        .cloned()
        .collect()
}

/// Child entries in order, then the parent's new strings. Parent rule
/// objects are always appended.
pub fn merge_arguments(child: &[Value], parent: &[Value]) -> Vec<Value> {
    let mut seen: HashSet<&str> = child.iter().filter_map(Value::as_str).collect();
    let mut merged = child.to_vec();
    for entry in parent {
        match entry.as_str() {
            Some(arg) if !seen.insert(arg) => {}
            _ => merged.push(entry.clone()),
        }
    }
    merged
}

/// Merge `parent` into `child` and drop `inheritsFrom`. Fields the merge does
/// not know about are kept as they are.
pub fn merge_descriptors(child: &Value, parent: &Value) -> Value {
    let Some(child_obj) = child.as_object() else {
        return child.clone();
    };
    let mut merged = child_obj.clone();

    let libraries = merge_libraries(
        array_field(child_obj, "libraries"),
        parent
            .get("libraries")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    );
    merged.insert("libraries".into(), Value::Array(libraries));

    if let Some(parent_args) = parent.get("arguments").and_then(Value::as_object) {
        let mut arguments = child_obj
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for kind in ["game", "jvm"] {
            let child_list = array_field(&arguments, kind).to_vec();
            let parent_list = array_field(parent_args, kind);
            arguments.insert(
                kind.into(),
                Value::Array(merge_arguments(&child_list, parent_list)),
            );
        }
        merged.insert("arguments".into(), Value::Object(arguments));
    }

    let downloads_missing = merged
        .get("downloads")
        .and_then(Value::as_object)
        .map_or(true, Map::is_empty);
    if downloads_missing {
        if let Some(downloads) = parent.get("downloads") {
            merged.insert("downloads".into(), downloads.clone());
        }
    }

    for key in INHERITED_IF_ABSENT {
        if !merged.contains_key(key) {
            if let Some(value) = parent.get(key) {
                merged.insert(key.into(), value.clone());
            }
        }
    }

    merged.remove("inheritsFrom");
    Value::Object(merged)
}

fn array_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
