// SPDX-License-Identifier: MIT

//! Environment builder - composes the command registry

use std::collections::HashMap;
use std::sync::Arc;

use super::config::EnvironmentConfig;
use super::Extension;
use crate::dsl::command::Command;
use crate::dsl::error::ScopeError;
use crate::scope::registry::CommandRegistry;

/// Builds a registry from default commands and configured extensions
#[derive(Default)]
pub struct EnvironmentBuilder {
    defaults: Vec<Arc<dyn Command>>,
    extensions: HashMap<String, Arc<dyn Extension>>,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default command, always registered
    pub fn with_command(mut self, command: Arc<dyn Command>) -> Self {
        self.defaults.push(command);
        self
    }

    pub fn with_commands(mut self, commands: impl IntoIterator<Item = Arc<dyn Command>>) -> Self {
        self.defaults.extend(commands);
        self
    }

    /// Make an extension available; it only contributes when configured active
    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.insert(extension.name().to_string(), extension);
        self
    }

    /// Compose the registry.
    ///
    /// Defaults are registered first, then each active extension in name
    /// order. A later registration replaces an earlier one with the same name.
    pub async fn build(&self, config: &EnvironmentConfig) -> Result<CommandRegistry, ScopeError> {
        let registry = CommandRegistry::new().with_debug(config.debug);
        registry.extend(self.defaults.iter().cloned()).await;

        for name in config.active_extensions() {
            let extension = self.extensions.get(name).ok_or_else(|| {
                ScopeError::config(format!("Context extension declared but not found: {}", name))
            })?;

            extension
                .activate()
                .await
                .map_err(|source| ScopeError::Extension {
                    name: name.to_string(),
                    source,
                })?;

            let commands = extension
                .commands()
                .await
                .map_err(|source| ScopeError::Extension {
                    name: name.to_string(),
                    source,
                })?;

            log::info!("Activated extension '{}' ({} commands)", name, commands.len());
            registry.extend(commands).await;
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::command::{FnCommand, Registry};
    use crate::dsl::error::BoxError;
    use crate::dsl::value::Value;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// A mock extension for testing
    struct MockExtension {
        name: String,
        commands: Vec<(&'static str, i64)>,
        activated: AtomicBool,
        fail_activation: bool,
    }

    impl MockExtension {
        fn new(name: &str, commands: Vec<(&'static str, i64)>) -> Self {
            Self {
                name: name.to_string(),
                commands,
                activated: AtomicBool::new(false),
                fail_activation: false,
            }
        }
    }

    #[async_trait]
    impl Extension for MockExtension {
        fn name(&self) -> &str {
            &self.name
        }

        async fn activate(&self) -> Result<(), BoxError> {
            if self.fail_activation {
                return Err("activation refused".into());
            }
            self.activated.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn commands(&self) -> Result<Vec<Arc<dyn Command>>, BoxError> {
            if !self.activated.load(Ordering::SeqCst) {
                return Err("not activated".into());
            }
            Ok(self
                .commands
                .iter()
                .map(|(name, value)| {
                    Arc::new(FnCommand::constant(*name, Value::from(*value))) as Arc<dyn Command>
                })
                .collect())
        }
    }

    fn config(extensions: &[(&str, bool)]) -> EnvironmentConfig {
        EnvironmentConfig {
            debug: false,
            extensions: extensions
                .iter()
                .map(|(name, active)| (name.to_string(), *active))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_defaults_only() {
        let builder = EnvironmentBuilder::new()
            .with_command(Arc::new(FnCommand::constant("answer", Value::from(42i64))));

        let registry = builder.build(&EnvironmentConfig::default()).await.unwrap();
        assert_eq!(registry.invoke("answer", vec![]).await.unwrap(), Value::from(42i64));
        assert!(!registry.debug());
    }

    #[tokio::test]
    async fn test_later_registrations_override() {
        let builder = EnvironmentBuilder::new()
            .with_command(Arc::new(FnCommand::constant("shared", Value::from(0i64))))
            .with_extension(Arc::new(MockExtension::new("alpha", vec![("shared", 1)])))
            .with_extension(Arc::new(MockExtension::new("beta", vec![("shared", 2), ("own", 3)])));

        let registry = builder
            .build(&config(&[("beta", true), ("alpha", true)]))
            .await
            .unwrap();
        assert_eq!(registry.invoke("shared", vec![]).await.unwrap(), Value::from(2i64));
        assert_eq!(registry.invoke("own", vec![]).await.unwrap(), Value::from(3i64));
    }

    #[tokio::test]
    async fn test_inactive_extension_is_skipped() {
        let builder = EnvironmentBuilder::new()
            .with_extension(Arc::new(MockExtension::new("alpha", vec![("alpha.value", 1)])));

        let registry = builder.build(&config(&[("alpha", false)])).await.unwrap();
        assert!(registry.get("alpha.value").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_extension() {
        let builder = EnvironmentBuilder::new();
        let err = builder.build(&config(&[("git", true)])).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Context extension declared but not found: git"
        );
    }

    #[tokio::test]
    async fn test_activation_failure() {
        let mut extension = MockExtension::new("broken", vec![]);
        extension.fail_activation = true;
        let builder = EnvironmentBuilder::new().with_extension(Arc::new(extension));

        let err = builder.build(&config(&[("broken", true)])).await.unwrap_err();
        match err {
            ScopeError::Extension { name, source } => {
                assert_eq!(name, "broken");
                assert_eq!(source.to_string(), "activation refused");
            }
            other => panic!("Expected extension error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_debug_flag_reaches_registry() {
        let mut config = config(&[]);
        config.debug = true;
        let registry = EnvironmentBuilder::new().build(&config).await.unwrap();
        assert!(registry.debug());
    }
}
