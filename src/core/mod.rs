// ─── PackSync Core ───
// Keeps one managed game directory in step with a remotely published modpack.
//
// Architecture:
//   core/
//     modpack/    — Manifest layering, update check, archive sync
//     instance/   — Managed root layout + path retention policy
//     version/    — Version catalog + descriptor reconciliation
//     loaders/    — Vanilla, Fabric, Forge
//     java/       — Runtime provisioning per Java major
//     downloader/ — HTTP transport with timeouts + SHA-1 helpers
//     launch/     — Launch configuration + engine seam
//     auth/       — Offline and federated profiles
//     state/      — Settings + reconciliation orchestrator

pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod instance;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod modpack;
pub mod progress;
pub mod state;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;
