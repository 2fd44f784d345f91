//! Token signers for the supported algorithms

mod hmac_signer;
mod rsa_signer;

pub use hmac_signer::HmacSigner;
pub use rsa_signer::RsaSigner;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation};
use std::sync::Arc;

use crate::domain::Claims;
use crate::errors::TokenError;

use super::clock::Clock;
use super::config::{SigningAlgorithm, TokenSettings};
use super::key_store::KeyStore;
use super::keys::KeyGenerator;

/// Signs claims into compact JWTs and verifies them back
pub trait Signer: Send + Sync {
    /// Serialises and signs fully stamped claims
    fn sign(&self, claims: &Claims) -> Result<String, TokenError>;

    /// Checks signature, issuer, audience and validity window, then returns the claims
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;

    fn algorithm(&self) -> SigningAlgorithm;

    /// Identifier of the current signing key; empty for symmetric keys
    fn key_id(&self) -> String;
}

/// The signer selected by configuration
#[derive(Debug)]
pub enum TokenSigner {
    Hmac(HmacSigner),
    Rsa(RsaSigner),
}

impl TokenSigner {
    /// Builds the signer for `settings.algorithm`
    pub fn from_settings(
        settings: &TokenSettings,
        clock: Arc<dyn Clock>,
        generator: &dyn KeyGenerator,
    ) -> Result<Self, TokenError> {
        match settings.algorithm {
            SigningAlgorithm::HS256 => HmacSigner::new(settings, clock).map(TokenSigner::Hmac),
            SigningAlgorithm::RS256 => {
                RsaSigner::new(settings, clock, generator).map(TokenSigner::Rsa)
            }
        }
    }

    /// Key store behind an RSA signer
    pub fn key_store(&self) -> Option<&Arc<KeyStore>> {
        match self {
            TokenSigner::Hmac(_) => None,
            TokenSigner::Rsa(signer) => Some(signer.key_store()),
        }
    }
}

impl Signer for TokenSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        match self {
            TokenSigner::Hmac(signer) => signer.sign(claims),
            TokenSigner::Rsa(signer) => signer.sign(claims),
        }
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        match self {
            TokenSigner::Hmac(signer) => signer.verify(token),
            TokenSigner::Rsa(signer) => signer.verify(token),
        }
    }

    fn algorithm(&self) -> SigningAlgorithm {
        match self {
            TokenSigner::Hmac(signer) => signer.algorithm(),
            TokenSigner::Rsa(signer) => signer.algorithm(),
        }
    }

    fn key_id(&self) -> String {
        match self {
            TokenSigner::Hmac(signer) => signer.key_id(),
            TokenSigner::Rsa(signer) => signer.key_id(),
        }
    }
}

/// Decodes tokens and applies the time checks against the injected clock.
///
/// `jsonwebtoken` checks signature, algorithm, issuer and audience; its own
/// `exp`/`nbf` checks read the system time and are switched off.
pub(crate) struct TokenValidator {
    validation: Validation,
    unverified: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub(crate) fn new(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Self {
        let algorithm = settings.algorithm.jwt_algorithm();

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[settings.issuer.as_str()]);
        if settings.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(settings.audience.as_slice());
        }

        let mut unverified = Validation::new(algorithm);
        unverified.insecure_disable_signature_validation();
        unverified.validate_exp = false;
        unverified.validate_nbf = false;
        unverified.validate_aud = false;
        unverified.set_required_spec_claims(&["exp"]);

        Self {
            validation,
            unverified,
            clock,
        }
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub(crate) fn decode(&self, token: &str, key: &DecodingKey) -> Result<Claims, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, key, &self.validation)
            .map_err(classify)?
            .claims;

        let now = self.clock.now();
        if claims.is_expired_at(now) {
            return Err(TokenError::TokenExpired);
        }
        if claims.is_premature_at(now) {
            return Err(TokenError::TokenNotYetValid);
        }
        Ok(claims)
    }

    /// Reads `exp` without checking the signature.
    ///
    /// Only picks the error kind for a token whose key is no longer held;
    /// the token is rejected regardless of the answer.
    pub(crate) fn is_expired_unverified(&self, token: &str) -> bool {
        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &self.unverified)
            .map(|data| data.claims.is_expired_at(self.clock.now()))
            .unwrap_or(false)
    }
}

/// Maps `jsonwebtoken` failures onto the verification error kinds
pub(crate) fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => TokenError::MalformedToken,
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::ImmatureSignature => TokenError::TokenNotYetValid,
        ErrorKind::InvalidSignature => TokenError::invalid("signature mismatch"),
        ErrorKind::InvalidIssuer => TokenError::invalid("issuer mismatch"),
        ErrorKind::InvalidAudience => TokenError::invalid("audience mismatch"),
        ErrorKind::InvalidAlgorithm => TokenError::invalid("unexpected signing algorithm"),
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::invalid(format!("missing required claim: {claim}"))
        }
        other => TokenError::invalid(format!("{other:?}")),
    }
}
