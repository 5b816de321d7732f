use async_trait::async_trait;

use super::config::LaunchConfig;
use crate::core::error::LauncherResult;
use crate::core::progress::ProgressSink;

/// External game-launch engine. Receives a finished configuration and owns
/// the game process from there on.
#[async_trait]
pub trait LaunchEngine: Send + Sync {
    async fn launch(&self, config: &LaunchConfig, progress: ProgressSink) -> LauncherResult<()>;
}
