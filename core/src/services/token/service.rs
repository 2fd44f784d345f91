//! Process-facing token service

use tracing::debug;

use ta_shared::TokenConfig;

use crate::domain::Claims;
use crate::errors::TokenError;

use super::key_store::RotationOutcome;
use super::keys::JwkSet;
use super::manager::TokenManager;

/// Device token issuance and verification for the rest of the process.
///
/// Constructed once at startup and shared behind an `Arc`; all methods take
/// `&self`.
#[derive(Debug)]
pub struct TokenService {
    manager: TokenManager,
}

impl TokenService {
    /// Creates a new token service from configuration
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        TokenManager::new(config).map(Self::from_manager)
    }

    /// Wraps an existing manager
    pub fn from_manager(manager: TokenManager) -> Self {
        Self { manager }
    }

    /// Issues a token bound to a user, client address and device
    pub fn generate_device_token(
        &self,
        user_id: u64,
        client_ip: &str,
        device_id: &str,
    ) -> Result<String, TokenError> {
        let token = self
            .manager
            .generate(Claims::new(user_id, client_ip, device_id))?;
        debug!(user_id, device_id, "Issued device token");
        Ok(token)
    }

    /// Verifies a token and returns its claims
    pub fn verify_and_parse(&self, token: &str) -> Result<Claims, TokenError> {
        self.manager.verify(token).map_err(|e| {
            debug!("Token rejected: {}", e);
            e
        })
    }

    /// Rotates the signing key now (RS256 only)
    pub async fn rotate_keys(&self) -> Result<RotationOutcome, TokenError> {
        self.manager.rotate_key().await
    }

    /// Starts scheduled rotation when configured
    pub fn start_rotation(&self) -> bool {
        self.manager.start_rotation()
    }

    /// Stops scheduled rotation
    pub async fn shutdown(&self) {
        self.manager.shutdown().await
    }

    pub fn jwks(&self) -> JwkSet {
        self.manager.jwks()
    }

    pub fn manager(&self) -> &TokenManager {
        &self.manager
    }
}
