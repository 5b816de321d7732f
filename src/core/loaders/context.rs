use crate::core::downloader::Transport;
use crate::core::instance::ManagedRoot;
use crate::core::java::RuntimeProvisioner;
use crate::core::progress::ProgressSink;

/// Everything a loader installer needs, borrowed from the orchestrator.
pub struct InstallContext<'a> {
    pub minecraft_version: &'a str,
    pub loader_version: &'a str,
    pub root: &'a ManagedRoot,
    pub transport: &'a dyn Transport,
    pub runtime: &'a RuntimeProvisioner,
    pub progress: &'a ProgressSink,
}
