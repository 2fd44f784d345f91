//! Token issuance and signing-key configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token configuration as delivered by a configuration source.
///
/// Durations are expressed in seconds. The value is treated as immutable once
/// a token manager has been built from it; changes require a new manager.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Signing algorithm (`HS256` or `RS256`)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// HMAC shared secret (at least 32 bytes)
    #[serde(default)]
    pub secret_key: String,

    /// RSA public key, SPKI PEM
    #[serde(default)]
    pub public_key: String,

    /// RSA private key, PKCS#1 or PKCS#8 PEM
    #[serde(default)]
    pub private_key: String,

    /// Token lifetime in seconds
    #[serde(default = "default_expiration")]
    pub expiration: u64,

    /// `iss` claim stamped on every token
    pub issuer: String,

    /// `aud` claim stamped on every token
    #[serde(default)]
    pub audience: Vec<String>,

    /// Key rotation interval in seconds (0 disables scheduled rotation)
    #[serde(default)]
    pub key_rotation: u64,

    /// Minimum time in seconds a retired key stays usable for verification
    #[serde(default)]
    pub key_rotation_grace_period: u64,

    /// Maximum number of retired public keys retained
    #[serde(default = "default_max_retired_keys")]
    pub max_retired_keys: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            secret_key: String::new(),
            public_key: String::new(),
            private_key: String::new(),
            expiration: default_expiration(),
            issuer: String::from("token-authority"),
            audience: Vec::new(),
            key_rotation: 0,
            key_rotation_grace_period: 0,
            max_retired_keys: default_max_retired_keys(),
        }
    }
}

impl TokenConfig {
    /// HS256 configuration with the given shared secret
    pub fn hmac(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            algorithm: String::from("HS256"),
            secret_key: secret.into(),
            issuer: issuer.into(),
            ..Default::default()
        }
    }

    /// RS256 configuration with a pre-provisioned key pair
    pub fn rsa(
        private_key_pem: impl Into<String>,
        public_key_pem: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: String::from("RS256"),
            private_key: private_key_pem.into(),
            public_key: public_key_pem.into(),
            issuer: issuer.into(),
            ..Default::default()
        }
    }

    /// Set the audience list
    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    /// Set token expiration in minutes
    pub fn with_expiration_minutes(mut self, minutes: u64) -> Self {
        self.expiration = minutes * 60;
        self
    }

    /// Set the key rotation interval in seconds
    pub fn with_key_rotation(mut self, seconds: u64) -> Self {
        self.key_rotation = seconds;
        self
    }

    /// Set the maximum number of retired keys
    pub fn with_max_retired_keys(mut self, max: usize) -> Self {
        self.max_retired_keys = max;
        self
    }

    /// Whether scheduled key rotation is enabled
    pub fn rotation_enabled(&self) -> bool {
        self.key_rotation > 0
    }

    /// Whether RSA key material was supplied
    pub fn has_key_pair(&self) -> bool {
        !self.private_key.trim().is_empty() || !self.public_key.trim().is_empty()
    }
}

// Secrets stay out of logs.
impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("algorithm", &self.algorithm)
            .field("secret_key", &redact(&self.secret_key))
            .field("public_key", &redact(&self.public_key))
            .field("private_key", &redact(&self.private_key))
            .field("expiration", &self.expiration)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("key_rotation", &self.key_rotation)
            .field("key_rotation_grace_period", &self.key_rotation_grace_period)
            .field("max_retired_keys", &self.max_retired_keys)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

fn default_algorithm() -> String {
    String::from("HS256")
}

fn default_expiration() -> u64 {
    900 // 15 minutes
}

fn default_max_retired_keys() -> usize {
    3
}
