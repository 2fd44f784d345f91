//! File-backed configuration source with polling

use async_trait::async_trait;
use config::{Config, ConfigError, Environment, File};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ta_core::errors::ConfigSourceError;
use ta_core::services::{ConfigSource, TokenSettings};
use ta_shared::{AppConfig, ConfigSourceSettings, TokenConfig};

/// Loads the application configuration from `path`, layered with environment
/// overrides named `<PREFIX>__SECTION__KEY` (e.g. `TA__TOKEN__ISSUER`).
pub fn load_app_config(path: &Path, env_prefix: &str) -> Result<AppConfig, ConfigSourceError> {
    if !path.is_file() {
        return Err(ConfigSourceError::Load {
            message: format!("config file not found: {}", path.display()),
        });
    }

    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("token.audience")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| match e {
            ConfigError::FileParse { .. } => ConfigSourceError::Parse {
                message: e.to_string(),
            },
            _ => ConfigSourceError::Load {
                message: e.to_string(),
            },
        })?;

    config
        .try_deserialize::<AppConfig>()
        .map_err(|e| ConfigSourceError::Parse {
            message: e.to_string(),
        })
}

/// Loads and validates just the token section
pub fn load_token_config(path: &Path, env_prefix: &str) -> Result<TokenConfig, ConfigSourceError> {
    let token = load_app_config(path, env_prefix)?.token;
    TokenSettings::from_config(&token).map_err(|e| ConfigSourceError::Parse {
        message: e.to_string(),
    })?;
    Ok(token)
}

/// Token configuration read from a local file and re-read when it changes
pub struct FileConfigSource {
    settings: ConfigSourceSettings,
    poll_period: Duration,
    receiver: Mutex<Option<watch::Receiver<TokenConfig>>>,
    cancel: CancellationToken,
}

impl FileConfigSource {
    /// Creates a source after validating its settings
    pub fn new(settings: ConfigSourceSettings) -> Result<Self, ConfigSourceError> {
        settings
            .validate()
            .map_err(|message| ConfigSourceError::InvalidSettings { message })?;

        Ok(Self {
            poll_period: Duration::from_secs(settings.poll_interval),
            settings,
            receiver: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Overrides the poll period with sub-second precision
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        if !period.is_zero() {
            self.poll_period = period;
        }
        self
    }

    pub fn settings(&self) -> &ConfigSourceSettings {
        &self.settings
    }

    /// Loads the full application configuration
    pub fn load(&self) -> Result<AppConfig, ConfigSourceError> {
        load_app_config(&self.settings.path, &self.settings.env_prefix)
    }

    /// Stops the polling task, if one was started
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch(&self) -> Result<TokenConfig, ConfigSourceError> {
        let path = self.settings.path.clone();
        let env_prefix = self.settings.env_prefix.clone();
        tokio::task::spawn_blocking(move || load_token_config(&path, &env_prefix))
            .await
            .map_err(|e| ConfigSourceError::Load {
                message: format!("config load task failed: {}", e),
            })?
    }

    async fn watch(&self) -> Result<watch::Receiver<TokenConfig>, ConfigSourceError> {
        let mut slot = self.receiver.lock().await;
        if let Some(receiver) = slot.as_ref() {
            return Ok(receiver.clone());
        }
        if self.cancel.is_cancelled() {
            return Err(ConfigSourceError::Watch {
                message: "config source has been shut down".to_string(),
            });
        }

        let initial = self.fetch().await?;
        let (sender, receiver) = watch::channel(initial);
        let poller = Poller {
            path: self.settings.path.clone(),
            env_prefix: self.settings.env_prefix.clone(),
            fingerprint: read_fingerprint(self.settings.path.clone()).await,
            sender,
        };
        tokio::spawn(poller.run(self.poll_period, self.cancel.clone()));
        info!(
            path = %self.settings.path.display(),
            "Watching token configuration every {:?}",
            self.poll_period
        );

        *slot = Some(receiver.clone());
        Ok(receiver)
    }
}

impl Drop for FileConfigSource {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// SHA-256 of the file contents
type Fingerprint = [u8; 32];

fn file_fingerprint(path: &Path) -> Option<Fingerprint> {
    let bytes = std::fs::read(path).ok()?;
    Some(Sha256::digest(&bytes).into())
}

async fn read_fingerprint(path: PathBuf) -> Option<Fingerprint> {
    tokio::task::spawn_blocking(move || file_fingerprint(&path))
        .await
        .ok()
        .flatten()
}

enum PollResult {
    Unreadable,
    Unchanged,
    Changed(Fingerprint, Result<TokenConfig, ConfigSourceError>),
}

struct Poller {
    path: PathBuf,
    env_prefix: String,
    fingerprint: Option<Fingerprint>,
    sender: watch::Sender<TokenConfig>,
}

impl Poller {
    async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.sender.closed() => break,
                _ = ticker.tick() => {}
            }
            self.poll().await;
        }
        debug!(path = %self.path.display(), "Stopped watching token configuration");
    }

    async fn poll(&mut self) {
        let path = self.path.clone();
        let env_prefix = self.env_prefix.clone();
        let previous = self.fingerprint;

        // Reading and parsing the file blocks
        let result = tokio::task::spawn_blocking(move || {
            let Some(fingerprint) = file_fingerprint(&path) else {
                return PollResult::Unreadable;
            };
            if previous == Some(fingerprint) {
                return PollResult::Unchanged;
            }
            PollResult::Changed(fingerprint, load_token_config(&path, &env_prefix))
        })
        .await;

        match result {
            Err(e) => warn!("Token configuration poll failed: {}", e),
            Ok(PollResult::Unreadable) => {
                warn!(path = %self.path.display(), "Token configuration file is unreadable");
            }
            Ok(PollResult::Unchanged) => {}
            Ok(PollResult::Changed(fingerprint, loaded)) => {
                self.fingerprint = Some(fingerprint);
                self.publish(loaded);
            }
        }
    }

    fn publish(&self, loaded: Result<TokenConfig, ConfigSourceError>) {
        match loaded {
            Ok(config) => {
                let changed = self.sender.send_if_modified(|current| {
                    if *current == config {
                        return false;
                    }
                    *current = config;
                    true
                });
                if changed {
                    info!(path = %self.path.display(), "Token configuration updated");
                }
            }
            Err(e) => {
                warn!("Ignoring token configuration update: {}", e);
            }
        }
    }
}
