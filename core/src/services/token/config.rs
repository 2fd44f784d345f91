//! Validated token settings derived from [`TokenConfig`]

use chrono::Duration;
use std::fmt;
use std::str::FromStr;

use ta_shared::TokenConfig;

use crate::errors::TokenError;

/// Minimum HMAC secret length in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Upper bound for any configured duration (ten years)
const MAX_DURATION_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Supported signing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256 over a shared secret
    HS256,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::HS256 => "HS256",
            SigningAlgorithm::RS256 => "RS256",
        }
    }

    pub(crate) fn jwt_algorithm(&self) -> jsonwebtoken::Algorithm {
        match self {
            SigningAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            SigningAlgorithm::RS256 => jsonwebtoken::Algorithm::RS256,
        }
    }

    /// Whether keys for this algorithm can be rotated
    pub fn supports_rotation(&self) -> bool {
        matches!(self, SigningAlgorithm::RS256)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::HS256),
            "RS256" => Ok(SigningAlgorithm::RS256),
            _ => Err(TokenError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
            }),
        }
    }
}

/// Token settings checked and converted from a [`TokenConfig`]
#[derive(Clone)]
pub struct TokenSettings {
    pub algorithm: SigningAlgorithm,
    pub(crate) secret_key: Vec<u8>,
    pub(crate) private_key_pem: String,
    pub(crate) public_key_pem: String,
    /// Token lifetime
    pub expiration: Duration,
    pub issuer: String,
    pub audience: Vec<String>,
    /// Scheduled rotation interval, `None` when disabled
    pub key_rotation: Option<Duration>,
    pub grace_period: Duration,
    pub max_retired_keys: usize,
}

impl TokenSettings {
    /// Validates a configuration and converts it into settings
    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        let algorithm: SigningAlgorithm = config.algorithm.parse()?;

        if config.issuer.trim().is_empty() {
            return Err(TokenError::config("issuer is required"));
        }
        if config.audience.iter().any(|aud| aud.trim().is_empty()) {
            return Err(TokenError::config("audience entries must not be empty"));
        }
        if config.expiration == 0 {
            return Err(TokenError::config("expiration must be greater than zero"));
        }
        if algorithm == SigningAlgorithm::HS256 && config.secret_key.len() < MIN_SECRET_LENGTH {
            return Err(TokenError::SecretTooShort {
                minimum: MIN_SECRET_LENGTH,
                actual: config.secret_key.len(),
            });
        }
        if algorithm == SigningAlgorithm::RS256 && config.max_retired_keys == 0 {
            return Err(TokenError::config(
                "max_retired_keys must be at least 1 for RS256",
            ));
        }

        let key_rotation = match config.key_rotation {
            0 => None,
            seconds => Some(to_duration("key_rotation", seconds)?),
        };

        Ok(Self {
            algorithm,
            secret_key: config.secret_key.as_bytes().to_vec(),
            private_key_pem: config.private_key.clone(),
            public_key_pem: config.public_key.clone(),
            expiration: to_duration("expiration", config.expiration)?,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            key_rotation,
            grace_period: to_duration("key_rotation_grace_period", config.key_rotation_grace_period)?,
            max_retired_keys: config.max_retired_keys,
        })
    }

    /// How long a retired key stays usable for verification.
    ///
    /// Twice the rotation interval, extended to the grace period or the token
    /// lifetime when either is longer.
    pub fn retired_key_retention(&self) -> Duration {
        let two_intervals = self.key_rotation.map(|r| r * 2).unwrap_or_else(Duration::zero);
        two_intervals.max(self.grace_period).max(self.expiration)
    }

    /// Planned lifetime of a freshly installed key: three rotation intervals
    pub fn active_key_lifetime(&self) -> Option<Duration> {
        self.key_rotation.map(|r| r * 3)
    }

    /// Whether RSA key material was pre-provisioned
    pub(crate) fn has_key_pair(&self) -> bool {
        !self.private_key_pem.trim().is_empty() || !self.public_key_pem.trim().is_empty()
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("algorithm", &self.algorithm)
            .field("expiration", &self.expiration)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("key_rotation", &self.key_rotation)
            .field("grace_period", &self.grace_period)
            .field("max_retired_keys", &self.max_retired_keys)
            .finish_non_exhaustive()
    }
}

fn to_duration(field: &str, seconds: u64) -> Result<Duration, TokenError> {
    if seconds > MAX_DURATION_SECONDS {
        return Err(TokenError::config(format!(
            "{field} exceeds {MAX_DURATION_SECONDS} seconds"
        )));
    }
    // Bounded above, so the conversion cannot overflow.
    Ok(Duration::seconds(seconds as i64))
}
