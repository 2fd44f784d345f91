//! Configuration source and policy store settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the watched token configuration source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigSourceSettings {
    /// File holding the token configuration (TOML, YAML or JSON by extension)
    pub path: PathBuf,

    /// Prefix for environment overrides, e.g. `TA` for `TA__TOKEN__ISSUER`
    pub env_prefix: String,

    /// How often the source is checked for changes, in seconds
    pub poll_interval: u64,
}

impl Default for ConfigSourceSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/token.toml"),
            env_prefix: default_env_prefix(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl ConfigSourceSettings {
    /// Create settings for a file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the poll interval in seconds
    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.poll_interval = seconds;
        self
    }

    /// Check that all required fields are present
    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err(String::from("config source path is required"));
        }
        if self.poll_interval == 0 {
            return Err(String::from("config source poll_interval must be greater than zero"));
        }
        if self.env_prefix.contains("__") {
            return Err(format!(
                "config source env_prefix must not contain the separator: {}",
                self.env_prefix
            ));
        }
        Ok(())
    }
}

/// Settings for the policy tuple store
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PolicyStoreConfig {
    /// File the policy tuples are persisted to; in-memory only when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_env_prefix() -> String {
    String::from("TA")
}

fn default_poll_interval() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ConfigSourceSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.env_prefix, "TA");
        assert_eq!(settings.poll_interval, 30);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(ConfigSourceSettings::new("").validate().is_err());
        assert!(ConfigSourceSettings::new("token.toml")
            .with_poll_interval(0)
            .validate()
            .is_err());

        let mut settings = ConfigSourceSettings::new("token.toml");
        settings.env_prefix = String::from("TA__X");
        assert!(settings.validate().is_err());
    }
}
