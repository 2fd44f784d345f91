use jsonwebtoken::{decode_header, encode, Header};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::Claims;
use crate::errors::TokenError;
use crate::services::token::clock::Clock;
use crate::services::token::config::{SigningAlgorithm, TokenSettings};
use crate::services::token::key_store::KeyStore;
use crate::services::token::keys::{self, KeyGenerator};

use super::{classify, Signer, TokenValidator};

/// RS256 signer backed by a rotating [`KeyStore`]
pub struct RsaSigner {
    store: Arc<KeyStore>,
    validator: TokenValidator,
}

impl RsaSigner {
    /// Loads the configured key pair, or generates one when both PEMs are empty
    pub fn new(
        settings: &TokenSettings,
        clock: Arc<dyn Clock>,
        generator: &dyn KeyGenerator,
    ) -> Result<Self, TokenError> {
        let private_key = if settings.has_key_pair() {
            keys::load_key_pair(&settings.private_key_pem, &settings.public_key_pem)?
        } else {
            warn!("No RSA key pair configured, generating an ephemeral signing key");
            generator.generate()?
        };

        let store = Arc::new(KeyStore::new(settings.max_retired_keys));
        let kid = store.initialize(private_key, clock.now(), settings.active_key_lifetime())?;
        info!(kid = %kid, "RSA signing key installed");

        Ok(Self {
            store,
            validator: TokenValidator::new(settings, clock),
        })
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.store
    }
}

impl Signer for RsaSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        self.store.sign_with_current(|kid, key| {
            let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
            header.kid = Some(kid.to_string());
            encode(&header, claims, key).map_err(|e| TokenError::SigningFailed {
                message: e.to_string(),
            })
        })
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(classify)?;
        let key = match self
            .store
            .verification_key(header.kid.as_deref(), self.validator.now())
        {
            Ok(key) => key,
            Err(_) if self.validator.is_expired_unverified(token) => {
                return Err(TokenError::TokenExpired)
            }
            Err(e) => return Err(e),
        };

        let claims = self.validator.decode(token, key.decoding_key())?;
        key.record_verification();
        Ok(claims)
    }

    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::RS256
    }

    fn key_id(&self) -> String {
        self.store.current_key_id().unwrap_or_default()
    }
}

impl fmt::Debug for RsaSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSigner")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
