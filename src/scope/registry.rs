// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::dsl::command::{Command, Registry};
use crate::dsl::error::ScopeError;
use crate::dsl::value::Value;

/// Shared name → command table.
///
/// Clones share the same table, so commands registered through one handle
/// are visible through every other.
#[derive(Clone)]
pub struct CommandRegistry {
    commands: Arc<RwLock<HashMap<String, Arc<dyn Command>>>>,
    debug: bool,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Arc::new(RwLock::new(HashMap::new())),
            debug: false,
        }
    }

    /// Log every real command invocation at info level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Register a command, replacing any previous one with the same name
    pub async fn register(&self, command: Arc<dyn Command>) {
        let mut commands = self.commands.write().await;
        if commands
            .insert(command.name().to_string(), command.clone())
            .is_some()
        {
            log::debug!("Command '{}' overridden", command.name());
        }
    }

    /// Register several commands in order; later entries win
    pub async fn extend(&self, commands: impl IntoIterator<Item = Arc<dyn Command>>) {
        for command in commands {
            self.register(command).await;
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        let commands = self.commands.read().await;
        commands.get(name).cloned()
    }

    /// Registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let commands = self.commands.read().await;
        let mut names: Vec<String> = commands.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for CommandRegistry {
    async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, ScopeError> {
        let command = self
            .get(name)
            .await
            .ok_or_else(|| ScopeError::unknown_command(name))?;

        command
            .execute(args)
            .await
            .map_err(|source| ScopeError::command(name, source))
    }

    fn debug(&self) -> bool {
        self.debug
    }
}
