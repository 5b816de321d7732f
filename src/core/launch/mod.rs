pub mod config;
pub mod engine;

pub use config::{LaunchConfig, LaunchOptions, LoaderPointer, MemoryBounds, QuickPlay, VersionSelector};
pub use engine::LaunchEngine;
