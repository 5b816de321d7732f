pub mod orchestrator;
pub mod settings;

pub use orchestrator::Orchestrator;
pub use settings::{default_data_dir, instance_root, LauncherSettings};
