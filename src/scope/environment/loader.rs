//! Environment loader - YAML file loading and parsing
//!
//! JSON is a subset of YAML, so `.json` files load through the same path.

use super::config::EnvironmentConfig;
use crate::dsl::error::ScopeError;
use std::fs;
use std::path::Path;

/// Loads environment configuration files
pub struct EnvironmentLoader;

impl EnvironmentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a configuration file and apply environment overrides
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<EnvironmentConfig, ScopeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::parse_yaml(&content)?;
        log::debug!(
            "Loaded environment config from {} ({} extensions)",
            path.display(),
            config.extensions.len()
        );
        Ok(config.with_env_overrides())
    }

    /// Parse a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<EnvironmentConfig, ScopeError> {
        if content.trim().is_empty() {
            return Ok(EnvironmentConfig::default());
        }
        let config: EnvironmentConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new()
    }
}
