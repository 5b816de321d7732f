//! Command line definitions using the clap derive API

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// PackSync - keep a Minecraft instance in step with a published modpack
#[derive(Parser, Debug)]
#[command(name = "packsync", author, version, about)]
pub struct Cli {
    /// Managed game directory (defaults to the instance inside the data dir)
    #[arg(long, global = true, env = "PACKSYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// Override the manifest URL from the settings file
    #[arg(long, global = true, env = "PACKSYNC_MANIFEST_URL")]
    pub manifest_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check for a newer modpack and converge the managed directory
    Sync,

    /// Sync, install the loader and print the launch configuration as JSON
    Prepare(PrepareArgs),

    /// Ensure a Java runtime of the given major version is installed
    Runtime(RuntimeArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Player name for the launch profile
    #[arg(long, short = 'u', default_value = "Player")]
    pub username: String,
}

#[derive(Args, Debug)]
pub struct RuntimeArgs {
    /// Java major version, e.g. 21
    pub major: u32,
}
