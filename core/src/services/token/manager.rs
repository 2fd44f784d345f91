//! Token manager: issues and verifies tokens and owns key rotation

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use ta_shared::TokenConfig;

use crate::domain::Claims;
use crate::errors::TokenError;

use super::clock::{Clock, SystemClock};
use super::config::{SigningAlgorithm, TokenSettings};
use super::key_store::{KeyStore, KeyStoreStatus, RotationOutcome, RotationPolicy};
use super::keys::{self, JwkSet, KeyGenerator, RsaKeyGenerator};
use super::rotation::{self, RotationHandle, Rotator};
use super::signer::{Signer, TokenSigner};

/// Issues and verifies signed tokens for one configuration
///
/// Construction validates the configuration and loads (or generates) key
/// material; a manager without a usable signer cannot exist. Scheduled
/// rotation is started separately with [`TokenManager::start_rotation`]
/// because it needs a running Tokio runtime.
pub struct TokenManager {
    settings: TokenSettings,
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn KeyGenerator>,
    rotation: Mutex<Option<RotationHandle>>,
}

impl TokenManager {
    /// Creates a manager on the system clock with 2048-bit key generation
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        Self::with_components(
            config,
            Arc::new(SystemClock),
            Arc::new(RsaKeyGenerator::default()),
        )
    }

    /// Creates a manager with an explicit clock and key generator
    pub fn with_components(
        config: &TokenConfig,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn KeyGenerator>,
    ) -> Result<Self, TokenError> {
        let settings = TokenSettings::from_config(config).map_err(|e| {
            error!("Rejected token configuration: {}", e);
            e
        })?;

        let signer = TokenSigner::from_settings(&settings, Arc::clone(&clock), generator.as_ref())
            .map_err(|e| {
                error!("Failed to initialise {} signer: {}", settings.algorithm, e);
                e
            })?;

        info!(
            algorithm = %settings.algorithm,
            issuer = %settings.issuer,
            kid = %signer.key_id(),
            "Token manager initialised"
        );

        Ok(Self {
            settings,
            signer,
            clock,
            generator,
            rotation: Mutex::new(None),
        })
    }

    /// Stamps issuer, audience and validity window onto `claims` and signs them
    pub fn generate(&self, claims: Claims) -> Result<String, TokenError> {
        let claims = claims.stamp(
            &self.settings.issuer,
            &self.settings.audience,
            self.clock.now(),
            self.settings.expiration,
        );
        self.signer.sign(&claims)
    }

    /// Verifies a token and returns its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.signer.verify(token)
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.settings.algorithm
    }

    /// Identifier of the current signing key; empty for HS256
    pub fn key_id(&self) -> String {
        self.signer.key_id()
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    pub fn key_store(&self) -> Option<&Arc<KeyStore>> {
        self.signer.key_store()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Public keys currently accepted for verification; empty for HS256
    pub fn jwks(&self) -> JwkSet {
        self.key_store()
            .map(|store| store.jwks(self.clock.now()))
            .unwrap_or_default()
    }

    /// PEM of the current public key; `None` for HS256
    pub fn public_key_pem(&self) -> Result<Option<String>, TokenError> {
        match self.key_store().and_then(|store| store.current_public_key()) {
            Some(key) => keys::public_key_to_pem(&key).map(Some),
            None => Ok(None),
        }
    }

    /// State of the key ring; `None` for HS256
    pub fn key_status(&self) -> Option<KeyStoreStatus> {
        self.key_store().map(|store| store.status(self.clock.now()))
    }

    /// Rotates the signing key now
    pub async fn rotate_key(&self) -> Result<RotationOutcome, TokenError> {
        let outcome = self.rotator()?.rotate_once().await;
        match &outcome {
            Ok(outcome) => rotation::log_outcome(outcome),
            Err(e) => warn!("Manual key rotation failed: {}", e),
        }
        outcome
    }

    /// Starts scheduled rotation if configured and supported.
    ///
    /// Returns `true` when a rotation loop is running afterwards. Calling it
    /// again while the loop runs is a no-op. Outside a Tokio runtime nothing
    /// is started and `false` is returned.
    pub fn start_rotation(&self) -> bool {
        let Some(interval) = self.settings.key_rotation else {
            return false;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("Scheduled key rotation not started: no Tokio runtime");
            return false;
        }
        let rotator = match self.rotator() {
            Ok(rotator) => rotator,
            Err(e) => {
                warn!("Scheduled key rotation not started: {}", e);
                return false;
            }
        };
        let interval = match interval.to_std() {
            Ok(interval) => interval,
            Err(e) => {
                warn!("Scheduled key rotation not started, bad interval: {}", e);
                return false;
            }
        };

        let mut slot = self.rotation.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return true;
        }
        *slot = Some(rotator.spawn(interval));
        true
    }

    /// Whether the background rotation loop is alive
    pub fn is_rotation_running(&self) -> bool {
        self.rotation
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the rotation loop and waits for it to exit
    pub async fn shutdown(&self) {
        let handle = self.rotation.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    fn rotator(&self) -> Result<Rotator, TokenError> {
        let store = self
            .key_store()
            .ok_or_else(|| TokenError::RotationUnsupported {
                algorithm: self.settings.algorithm.to_string(),
            })?;

        Ok(Rotator::new(
            Arc::clone(store),
            Arc::clone(&self.generator),
            Arc::clone(&self.clock),
            RotationPolicy {
                retention: self.settings.retired_key_retention(),
                active_lifetime: self.settings.active_key_lifetime(),
            },
        ))
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        if let Some(handle) = self.rotation.get_mut().take() {
            handle.cancel();
        }
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("settings", &self.settings)
            .field("signer", &self.signer)
            .field("rotation_running", &self.is_rotation_running())
            .finish()
    }
}
