//! Token service module for JWT management
//!
//! This module handles all token-related operations including:
//! - Device token issuance and verification (HS256 and RS256)
//! - RSA key loading, validation and fingerprinting
//! - Signing key rotation with a bounded set of retired keys
//! - JWKS export of the keys still accepted for verification

mod clock;
mod config;
mod key_store;
mod keys;
mod manager;
mod rotation;
mod service;
mod signer;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SigningAlgorithm, TokenSettings, MIN_SECRET_LENGTH};
pub use key_store::{
    CurrentKeyStatus, KeyStore, KeyStoreStatus, KeyUsageSnapshot, RetiredKeyStatus,
    RotationOutcome, RotationPolicy,
};
pub use keys::{
    key_id, load_key_pair, parse_private_key_pem, parse_public_key_pem, private_key_to_pem,
    public_key_to_pem, validate_rsa_key, Jwk, JwkSet, KeyGenerator, RsaKeyGenerator,
    MIN_RSA_BITS, RSA_EXPONENT,
};
pub use manager::TokenManager;
pub use rotation::RotationHandle;
pub use service::TokenService;
pub use signer::{HmacSigner, RsaSigner, Signer, TokenSigner};
