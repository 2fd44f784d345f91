use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header};
use std::fmt;
use std::sync::Arc;

use crate::domain::Claims;
use crate::errors::TokenError;
use crate::services::token::clock::Clock;
use crate::services::token::config::{SigningAlgorithm, TokenSettings, MIN_SECRET_LENGTH};

use super::{Signer, TokenValidator};

/// HS256 signer over a shared secret
pub struct HmacSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validator: TokenValidator,
}

impl HmacSigner {
    pub fn new(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let secret = &settings.secret_key;
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(TokenError::SecretTooShort {
                minimum: MIN_SECRET_LENGTH,
                actual: secret.len(),
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validator: TokenValidator::new(settings, clock),
        })
    }
}

impl Signer for HmacSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(jsonwebtoken::Algorithm::HS256), claims, &self.encoding_key).map_err(
            |e| TokenError::SigningFailed {
                message: e.to_string(),
            },
        )
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.validator.decode(token, &self.decoding_key)
    }

    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::HS256
    }

    fn key_id(&self) -> String {
        String::new()
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("algorithm", &SigningAlgorithm::HS256)
            .finish_non_exhaustive()
    }
}
