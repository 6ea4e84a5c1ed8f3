// SPDX-License-Identifier: MIT

//! Registry composition
//!
//! A host supplies default commands plus any number of named extensions. The
//! configuration decides which extensions are active; their commands are
//! flattened into one [`CommandRegistry`](crate::scope::registry::CommandRegistry).

use async_trait::async_trait;
use std::sync::Arc;

use crate::dsl::command::Command;
use crate::dsl::error::BoxError;

pub mod builder;
pub mod config;
pub mod loader;

pub use builder::EnvironmentBuilder;
pub use config::EnvironmentConfig;
pub use loader::EnvironmentLoader;

/// A named bundle of commands that can be switched on by configuration
#[async_trait]
pub trait Extension: Send + Sync {
    /// Name used as the key under `extensions` in the configuration
    fn name(&self) -> &str;

    /// Prepare the extension; runs once, before `commands`
    async fn activate(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Commands contributed to the registry
    async fn commands(&self) -> Result<Vec<Arc<dyn Command>>, BoxError>;
}
