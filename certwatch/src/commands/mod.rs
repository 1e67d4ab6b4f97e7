use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;

pub mod config;
pub mod run;

/// Trait for all command implementations
#[async_trait]
pub trait Command {
    /// Execute the command with the provided context
    async fn execute(&mut self, context: &CommandContext) -> Result<()>;
}

/// Shared context for all commands
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}
