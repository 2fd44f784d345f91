//! Token authority daemon
//!
//! Loads configuration, builds the token service and policy store, runs key
//! rotation and watches the configuration file until interrupted.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ta_core::services::{ConfigChange, ConfigSource, PolicyManager, TokenService};
use ta_infra::{load_app_config, FileConfigSource, MemoryPolicyStore};
use ta_shared::{ConfigSourceSettings, Environment, TokenConfig};

mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let environment = Environment::from_env();
    dotenvy::from_filename(environment.env_file()).ok();

    let path = env::var("TA_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| Path::new("config").join(environment.config_file()));
    let env_prefix =
        env::var("TA_ENV_PREFIX").unwrap_or_else(|_| ConfigSourceSettings::default().env_prefix);

    let app = load_app_config(&path, &env_prefix)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    logging::init_logging(&app.logging);
    info!(
        environment = %app.environment,
        path = %path.display(),
        "Starting token authority"
    );

    let source = FileConfigSource::new(ConfigSourceSettings {
        path,
        env_prefix,
        ..app.source.clone()
    })
    .context("invalid config source settings")?;
    let token_config = source
        .fetch()
        .await
        .context("invalid token configuration")?;

    let service = Arc::new(TokenService::new(&token_config).context("failed to build token service")?);
    let manager = service.manager();
    info!(
        algorithm = %manager.algorithm(),
        kid = %manager.key_id(),
        published_keys = service.jwks().keys.len(),
        "Token service ready"
    );
    if service.start_rotation() {
        info!(
            interval_secs = token_config.key_rotation,
            "Key rotation scheduled"
        );
    }

    let policies = PolicyManager::new(
        MemoryPolicyStore::from_config(&app.policy)
            .await
            .context("failed to open policy store")?,
    );

    let updates = source
        .watch()
        .await
        .context("failed to watch token configuration")?;
    let watcher = spawn_config_watcher(token_config, updates);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");

    source.shutdown();
    watcher.abort();
    service.shutdown().await;
    if let Err(e) = policies.save_policies().await {
        warn!("Failed to save policies on shutdown: {}", e);
    }

    info!("Token authority stopped");
    Ok(())
}

/// Reports configuration updates against the configuration the service was
/// built from. Nothing is applied at runtime.
fn spawn_config_watcher(
    running: TokenConfig,
    mut updates: watch::Receiver<TokenConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let update = updates.borrow_and_update().clone();
            ConfigChange::between(&running, &update).log();
        }
    })
}
