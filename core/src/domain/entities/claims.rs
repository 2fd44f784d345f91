//! Claims carried inside signed access tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Claims structure for the token payload
///
/// Custom claims (`uid`, `cip`, `did`) are supplied by the caller; the
/// registered claims are stamped by the token manager at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub uid: u64,

    /// Client network address
    pub cip: String,

    /// Device ID
    pub did: String,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Audience
    #[serde(default)]
    pub aud: Vec<String>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Not before timestamp
    #[serde(default)]
    pub nbf: i64,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,
}

impl Claims {
    /// Creates unstamped claims for a user, client address and device
    pub fn new(uid: u64, client_ip: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            uid,
            cip: client_ip.into(),
            did: device_id.into(),
            iss: String::new(),
            aud: Vec::new(),
            iat: 0,
            nbf: 0,
            exp: 0,
        }
    }

    /// Stamps issuer, audience and the validity window.
    ///
    /// `iat` and `nbf` are set to `now`, `exp` to `now + lifetime`, so
    /// `iat <= nbf <= exp` holds for any non-negative lifetime.
    pub fn stamp(
        mut self,
        issuer: &str,
        audience: &[String],
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        let issued_at = now.timestamp();
        self.iss = issuer.to_string();
        self.aud = audience.to_vec();
        self.iat = issued_at;
        self.nbf = issued_at;
        self.exp = (now + lifetime).timestamp();
        self
    }

    /// Client network address
    pub fn client_ip(&self) -> &str {
        &self.cip
    }

    /// Device ID
    pub fn device_id(&self) -> &str {
        &self.did
    }

    /// Checks if the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Checks if the claims are not yet valid at `now`
    pub fn is_premature_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.nbf
    }

    /// Returns true when the registered fields satisfy `iat <= nbf <= exp`
    pub fn has_ordered_window(&self) -> bool {
        self.iat <= self.nbf && self.nbf <= self.exp
    }
}
