pub mod manifest;
pub mod reconcile;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use reconcile::{DescriptorReconciler, ReconcileReport, ReconcileStep, ReconcileWarning};
pub use version_file::{library_key, VersionHeader};
