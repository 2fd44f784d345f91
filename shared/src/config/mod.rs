//! Configuration module
//!
//! - `environment` - Environment detection and logging configuration
//! - `source` - Watched configuration source and policy store settings
//! - `token` - Token issuance and signing-key configuration

pub mod environment;
pub mod source;
pub mod token;

use serde::{Deserialize, Serialize};

pub use environment::{Environment, LogFormat, LoggingConfig};
pub use source::{ConfigSourceSettings, PolicyStoreConfig};
pub use token::TokenConfig;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Token configuration
    pub token: TokenConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Watched configuration source settings
    #[serde(default)]
    pub source: ConfigSourceSettings,

    /// Policy store configuration
    #[serde(default)]
    pub policy: PolicyStoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            token: TokenConfig::default(),
            logging: LoggingConfig::for_environment(env),
            source: ConfigSourceSettings::default(),
            policy: PolicyStoreConfig::default(),
        }
    }
}
