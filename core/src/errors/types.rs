//! Error types for token management, policy application and configuration sources

use thiserror::Error;

/// Token-related errors
///
/// Configuration errors are fatal at construction time. Verification errors
/// keep four distinguishable kinds (malformed, expired, not yet valid,
/// otherwise invalid) so callers can tell "fetch a new token" apart from
/// "reject as forged".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unsupported signing algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    #[error("HMAC secret too short: {actual} bytes (minimum {minimum})")]
    SecretTooShort { minimum: usize, actual: usize },

    #[error("Failed to parse key: {message}")]
    KeyParse { message: String },

    #[error("Public key does not match private key")]
    KeyPairMismatch,

    #[error("Key rejected: {message}")]
    WeakKey { message: String },

    #[error("Invalid token configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Token signing failed: {message}")]
    SigningFailed { message: String },

    #[error("Malformed token")]
    MalformedToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Key rotation is not supported for {algorithm}")]
    RotationUnsupported { algorithm: String },

    #[error("Key generation failed: {message}")]
    KeyGeneration { message: String },

    #[error("Key rotation aborted: {message}")]
    RotationAborted { message: String },
}

/// Coarse classification of [`TokenError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    Config,
    Signing,
    Malformed,
    Expired,
    NotYetValid,
    Invalid,
    Rotation,
}

impl TokenError {
    /// Classify the error
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::UnsupportedAlgorithm { .. }
            | TokenError::SecretTooShort { .. }
            | TokenError::KeyParse { .. }
            | TokenError::KeyPairMismatch
            | TokenError::WeakKey { .. }
            | TokenError::InvalidConfig { .. } => TokenErrorKind::Config,
            TokenError::SigningFailed { .. } => TokenErrorKind::Signing,
            TokenError::MalformedToken => TokenErrorKind::Malformed,
            TokenError::TokenExpired => TokenErrorKind::Expired,
            TokenError::TokenNotYetValid => TokenErrorKind::NotYetValid,
            TokenError::InvalidToken { .. } => TokenErrorKind::Invalid,
            TokenError::RotationUnsupported { .. }
            | TokenError::KeyGeneration { .. }
            | TokenError::RotationAborted { .. } => TokenErrorKind::Rotation,
        }
    }

    /// Whether the error is a verification failure
    pub fn is_verification_error(&self) -> bool {
        matches!(
            self.kind(),
            TokenErrorKind::Malformed
                | TokenErrorKind::Expired
                | TokenErrorKind::NotYetValid
                | TokenErrorKind::Invalid
        )
    }

    /// Whether the caller should obtain a fresh token rather than treat the
    /// presented one as forged
    pub fn is_renewable(&self) -> bool {
        matches!(self, TokenError::TokenExpired | TokenError::TokenNotYetValid)
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        TokenError::InvalidToken {
            reason: reason.into(),
        }
    }

    pub(crate) fn key_parse(message: impl Into<String>) -> Self {
        TokenError::KeyParse {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        TokenError::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Policy tuple errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unsupported policy type: {policy_type}")]
    UnsupportedPolicyType { policy_type: String },

    #[error("Policy parameters must not be empty")]
    EmptyParameters,

    #[error("Policy store failure: {message}")]
    Store { message: String },
}

/// Configuration source errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigSourceError {
    #[error("Invalid config source settings: {message}")]
    InvalidSettings { message: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },

    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },

    #[error("Configuration watch failed: {message}")]
    Watch { message: String },
}
