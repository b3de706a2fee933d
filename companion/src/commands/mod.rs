use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use elderly_companion::Config;

pub mod auth;
pub mod calendar;
pub mod schedule;

/// Trait for all command implementations
#[async_trait]
pub trait Command {
    /// Execute the command with the provided context
    async fn execute(&mut self, context: &CommandContext) -> Result<()>;
}

/// Shared context for all commands
pub struct CommandContext {
    pub config: Arc<Config>,
    pub debug: bool,
}

impl CommandContext {
    pub fn new(config: Arc<Config>, debug: bool) -> Self {
        Self { config, debug }
    }
}
