pub mod paths;
pub mod runtime;

pub use paths::{OsFamily, Platform};
pub use runtime::required_java_for_minecraft_version;
pub use runtime::RuntimeProvisioner;
