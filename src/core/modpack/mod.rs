pub mod extract;
pub mod manifest;
pub mod resolver;
pub mod sync;

pub use manifest::{Loader, Manifest, ManifestDocument};
pub use resolver::{needs_update, ManifestResolver, ManifestSource};
pub use sync::{ArchiveSynchronizer, SyncOutcome, SyncPlan};
