// SPDX-License-Identifier: MIT

//! Environment configuration schema

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable that forces debug logging on
pub const DEBUG_ENV: &str = "SCOPE_DEBUG";

/// How the command registry should be composed
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EnvironmentConfig {
    /// Log every real command invocation
    #[serde(default)]
    pub debug: bool,
    /// Extension name -> active
    #[serde(default)]
    pub extensions: BTreeMap<String, bool>,
}

impl EnvironmentConfig {
    /// Names of the active extensions, in registration order
    pub fn active_extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions
            .iter()
            .filter(|(_, active)| **active)
            .map(|(name, _)| name.as_str())
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        let debug = std::env::var(DEBUG_ENV).ok();
        self.with_debug_override(debug.as_deref())
    }

    /// `1`, `true` or `yes` force debug on; anything else leaves it alone
    pub fn with_debug_override(mut self, value: Option<&str>) -> Self {
        if let Some(value) = value {
            if matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                self.debug = true;
            }
        }
        self
    }
}
