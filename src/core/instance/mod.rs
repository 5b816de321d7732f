pub mod model;
pub mod policy;

pub use model::ManagedRoot;
pub use policy::{Decision, PathAction, PathPolicy};
