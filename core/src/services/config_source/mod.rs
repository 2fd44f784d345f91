//! Configuration source abstraction
//!
//! A source delivers the token configuration once at startup and then pushes
//! updates through a watch channel. Where the configuration lives (a file, a
//! remote registry) is an infrastructure concern.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use ta_shared::TokenConfig;

use crate::errors::ConfigSourceError;
use crate::services::token::SigningAlgorithm;

/// Supplier of [`TokenConfig`] values
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load the current configuration
    async fn fetch(&self) -> Result<TokenConfig, ConfigSourceError>;

    /// Subscribe to configuration updates.
    ///
    /// The receiver starts with the most recently loaded value; every valid
    /// update is published to it. Invalid updates are dropped by the source.
    async fn watch(&self) -> Result<watch::Receiver<TokenConfig>, ConfigSourceError>;
}

/// Compares algorithm names as the token manager parses them
fn same_algorithm(current: &str, update: &str) -> bool {
    match (current.parse::<SigningAlgorithm>(), update.parse::<SigningAlgorithm>()) {
        (Ok(current), Ok(update)) => current == update,
        _ => current.trim().eq_ignore_ascii_case(update.trim()),
    }
}

/// How a running token manager should treat a changed configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    /// Nothing relevant changed
    Unchanged,
    /// The signing algorithm changed; it is fixed for the life of the process
    AlgorithmRefused { current: String, requested: String },
    /// Other settings changed and take effect on restart
    RestartRequired { fields: Vec<&'static str> },
}

impl ConfigChange {
    /// Compares a running configuration with an update
    pub fn between(current: &TokenConfig, update: &TokenConfig) -> Self {
        if !same_algorithm(&current.algorithm, &update.algorithm) {
            return ConfigChange::AlgorithmRefused {
                current: current.algorithm.clone(),
                requested: update.algorithm.clone(),
            };
        }

        let mut fields = Vec::new();
        if current.secret_key != update.secret_key {
            fields.push("secret_key");
        }
        if current.private_key != update.private_key || current.public_key != update.public_key {
            fields.push("key_pair");
        }
        if current.expiration != update.expiration {
            fields.push("expiration");
        }
        if current.issuer != update.issuer {
            fields.push("issuer");
        }
        if current.audience != update.audience {
            fields.push("audience");
        }
        if current.key_rotation != update.key_rotation
            || current.key_rotation_grace_period != update.key_rotation_grace_period
        {
            fields.push("key_rotation");
        }
        if current.max_retired_keys != update.max_retired_keys {
            fields.push("max_retired_keys");
        }

        if fields.is_empty() {
            ConfigChange::Unchanged
        } else {
            ConfigChange::RestartRequired { fields }
        }
    }

    /// Logs the change at the appropriate level
    pub fn log(&self) {
        match self {
            ConfigChange::Unchanged => info!("Token configuration reloaded, no changes"),
            ConfigChange::AlgorithmRefused { current, requested } => warn!(
                current = %current,
                requested = %requested,
                "Refusing signing algorithm change at runtime"
            ),
            ConfigChange::RestartRequired { fields } => warn!(
                fields = ?fields,
                "Token configuration changed; restart to apply"
            ),
        }
    }
}
