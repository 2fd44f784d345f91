//! Signing key store and rotation state machine
//!
//! The store holds exactly one current RSA key once initialised, plus a
//! bounded map of retired public keys that stay usable for verification until
//! their archive expiry. Every read and the rotation swap go through the same
//! reader/writer lock, so readers never observe a half-rotated ring.
//!
//! ```text
//! uninitialized --initialize--> active --rotate--> active + retired(1..=max)
//!                                                    |            ^
//!                                                    +--rotate----+
//! ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use parking_lot::RwLock;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::TokenError;

use super::keys::{self, Jwk, JwkSet, KeyGenerator};

/// Timing parameters applied by [`KeyStore::rotate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// How long an archived key remains usable for verification
    pub retention: Duration,
    /// Planned lifetime of a newly installed key
    pub active_lifetime: Option<Duration>,
}

/// Result of a successful rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    /// Key that was archived, if any
    pub previous_kid: Option<String>,
    /// Newly installed current key
    pub current_kid: String,
    /// Retired keys dropped during this rotation (expired or over capacity)
    pub evicted: Vec<String>,
    /// Retired keys held after the rotation
    pub retired_count: usize,
}

/// Signature and verification counts for one key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsageSnapshot {
    pub signed: u64,
    pub verified: u64,
}

#[derive(Debug, Default)]
struct KeyUsage {
    signed: AtomicU64,
    verified: AtomicU64,
}

impl KeyUsage {
    fn snapshot(&self) -> KeyUsageSnapshot {
        KeyUsageSnapshot {
            signed: self.signed.load(Ordering::Relaxed),
            verified: self.verified.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the current key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentKeyStatus {
    pub kid: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// The key outlived its planned lifetime, i.e. rotations stopped happening
    pub overdue: bool,
    pub usage: KeyUsageSnapshot,
}

/// Point-in-time view of a retired key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredKeyStatus {
    pub kid: String,
    pub archived_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    pub usage: KeyUsageSnapshot,
}

/// Point-in-time view of the whole store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreStatus {
    pub current: Option<CurrentKeyStatus>,
    /// Oldest archive first
    pub retired: Vec<RetiredKeyStatus>,
}

struct ActiveKey {
    kid: String,
    public_key: RsaPublicKey,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    usage: Arc<KeyUsage>,
}

impl ActiveKey {
    /// The private key is consumed here; only the derived encoding key is kept.
    fn new(
        private_key: RsaPrivateKey,
        now: DateTime<Utc>,
        lifetime: Option<Duration>,
    ) -> Result<Self, TokenError> {
        let public_key = private_key.to_public_key();
        keys::validate_rsa_key(&public_key)?;

        Ok(Self {
            kid: keys::key_id(&public_key),
            encoding_key: keys::encoding_key(&private_key)?,
            decoding_key: keys::decoding_key(&public_key)?,
            public_key,
            created_at: now,
            expires_at: lifetime.map(|lifetime| now + lifetime),
            usage: Arc::new(KeyUsage::default()),
        })
    }

    fn retire(self, now: DateTime<Utc>, retention: Duration) -> RetiredKey {
        RetiredKey {
            public_key: self.public_key,
            decoding_key: self.decoding_key,
            archived_at: now,
            expires_at: now + retention,
            usage: self.usage,
        }
    }
}

struct RetiredKey {
    public_key: RsaPublicKey,
    decoding_key: DecodingKey,
    archived_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    usage: Arc<KeyUsage>,
}

impl RetiredKey {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Default)]
struct KeyRing {
    current: Option<ActiveKey>,
    retired: HashMap<String, RetiredKey>,
}

impl KeyRing {
    fn purge_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut expired: Vec<String> = self
            .retired
            .iter()
            .filter(|(_, key)| key.is_expired_at(now))
            .map(|(kid, _)| kid.clone())
            .collect();
        expired.sort();
        for kid in &expired {
            self.retired.remove(kid);
        }
        expired
    }

    /// Oldest archive; ties go to the smallest kid so eviction is deterministic
    fn oldest_retired(&self) -> Option<String> {
        self.retired
            .iter()
            .min_by(|(a_kid, a), (b_kid, b)| {
                a.archived_at
                    .cmp(&b.archived_at)
                    .then_with(|| a_kid.cmp(b_kid))
            })
            .map(|(kid, _)| kid.clone())
    }

    fn retired_by_age(&self) -> Vec<(&String, &RetiredKey)> {
        let mut retired: Vec<_> = self.retired.iter().collect();
        retired.sort_by(|(a_kid, a), (b_kid, b)| {
            a.archived_at
                .cmp(&b.archived_at)
                .then_with(|| a_kid.cmp(b_kid))
        });
        retired
    }
}

/// Key material handed to a verifier
pub(crate) struct VerificationKey {
    decoding_key: DecodingKey,
    usage: Arc<KeyUsage>,
}

impl VerificationKey {
    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub(crate) fn record_verification(&self) {
        self.usage.verified.fetch_add(1, Ordering::Relaxed);
    }
}

/// Current signing key plus retired verification keys
pub struct KeyStore {
    ring: RwLock<KeyRing>,
    max_retired: usize,
}

impl KeyStore {
    /// Creates an empty (uninitialised) store
    pub fn new(max_retired: usize) -> Self {
        Self {
            ring: RwLock::new(KeyRing::default()),
            max_retired,
        }
    }

    /// Maximum number of retired keys retained
    pub fn max_retired(&self) -> usize {
        self.max_retired
    }

    pub fn is_initialized(&self) -> bool {
        self.ring.read().current.is_some()
    }

    /// Installs the first current key. Fails if the store already has one.
    pub fn initialize(
        &self,
        private_key: RsaPrivateKey,
        now: DateTime<Utc>,
        lifetime: Option<Duration>,
    ) -> Result<String, TokenError> {
        let active = ActiveKey::new(private_key, now, lifetime)?;
        let mut ring = self.ring.write();
        if ring.current.is_some() {
            return Err(TokenError::config("key store is already initialized"));
        }
        let kid = active.kid.clone();
        ring.current = Some(active);
        Ok(kid)
    }

    /// Replaces the current key with a freshly generated one.
    ///
    /// Runs entirely under the write lock. Every fallible step happens before
    /// the ring is touched, so a failed rotation leaves the prior state as it was.
    pub fn rotate(
        &self,
        generator: &dyn KeyGenerator,
        now: DateTime<Utc>,
        policy: &RotationPolicy,
    ) -> Result<RotationOutcome, TokenError> {
        let mut ring = self.ring.write();

        let active = ActiveKey::new(generator.generate()?, now, policy.active_lifetime)?;
        if ring.current.as_ref().map(|current| current.kid.as_str()) == Some(active.kid.as_str()) {
            return Err(TokenError::KeyGeneration {
                message: "generated key duplicates the current key".to_string(),
            });
        }

        let mut evicted = ring.purge_expired(now);
        let previous = ring.current.take();
        let previous_kid = previous.as_ref().map(|key| key.kid.clone());

        if let Some(previous) = previous {
            if ring.retired.len() >= self.max_retired {
                if let Some(oldest) = ring.oldest_retired() {
                    ring.retired.remove(&oldest);
                    evicted.push(oldest);
                }
            }
            if self.max_retired > 0 {
                let kid = previous.kid.clone();
                ring.retired.insert(kid, previous.retire(now, policy.retention));
            }
        }

        let current_kid = active.kid.clone();
        ring.current = Some(active);

        Ok(RotationOutcome {
            previous_kid,
            current_kid,
            evicted,
            retired_count: ring.retired.len(),
        })
    }

    /// Runs `sign` with the current key id and encoding key under the read lock
    pub(crate) fn sign_with_current<F>(&self, sign: F) -> Result<String, TokenError>
    where
        F: FnOnce(&str, &EncodingKey) -> Result<String, TokenError>,
    {
        let ring = self.ring.read();
        let current = ring.current.as_ref().ok_or_else(|| TokenError::SigningFailed {
            message: "no active signing key".to_string(),
        })?;

        let token = sign(&current.kid, &current.encoding_key)?;
        current.usage.signed.fetch_add(1, Ordering::Relaxed);
        Ok(token)
    }

    /// Looks up the key a token claims to be signed with.
    ///
    /// Tokens without a `kid` are checked against the current key. Retired
    /// keys past their archive expiry are refused.
    pub(crate) fn verification_key(
        &self,
        kid: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerificationKey, TokenError> {
        let ring = self.ring.read();

        if let Some(current) = ring.current.as_ref() {
            if kid.map_or(true, |kid| kid == current.kid) {
                return Ok(VerificationKey {
                    decoding_key: current.decoding_key.clone(),
                    usage: Arc::clone(&current.usage),
                });
            }
        }

        let kid = kid.ok_or_else(|| TokenError::invalid("no signing key available"))?;
        match ring.retired.get(kid) {
            Some(retired) if retired.is_expired_at(now) => {
                Err(TokenError::invalid("signing key retired"))
            }
            Some(retired) => Ok(VerificationKey {
                decoding_key: retired.decoding_key.clone(),
                usage: Arc::clone(&retired.usage),
            }),
            None => Err(TokenError::invalid("unknown signing key")),
        }
    }

    pub fn current_key_id(&self) -> Option<String> {
        self.ring.read().current.as_ref().map(|key| key.kid.clone())
    }

    pub fn current_public_key(&self) -> Option<RsaPublicKey> {
        self.ring.read().current.as_ref().map(|key| key.public_key.clone())
    }

    /// Retired key ids, oldest archive first
    pub fn retired_key_ids(&self) -> Vec<String> {
        self.ring
            .read()
            .retired_by_age()
            .into_iter()
            .map(|(kid, _)| kid.clone())
            .collect()
    }

    pub fn retired_count(&self) -> usize {
        self.ring.read().retired.len()
    }

    pub fn usage(&self, kid: &str) -> Option<KeyUsageSnapshot> {
        let ring = self.ring.read();
        match ring.current.as_ref() {
            Some(current) if current.kid == kid => Some(current.usage.snapshot()),
            _ => ring.retired.get(kid).map(|key| key.usage.snapshot()),
        }
    }

    /// Public keys still accepted for verification at `now`
    pub fn jwks(&self, now: DateTime<Utc>) -> JwkSet {
        let ring = self.ring.read();
        let mut keys: Vec<Jwk> = ring
            .current
            .iter()
            .map(|current| Jwk::from_public_key(&current.public_key))
            .collect();
        keys.extend(
            ring.retired_by_age()
                .into_iter()
                .rev()
                .filter(|(_, key)| !key.is_expired_at(now))
                .map(|(_, key)| Jwk::from_public_key(&key.public_key)),
        );
        JwkSet { keys }
    }

    pub fn status(&self, now: DateTime<Utc>) -> KeyStoreStatus {
        let ring = self.ring.read();
        let current = ring.current.as_ref().map(|key| CurrentKeyStatus {
            kid: key.kid.clone(),
            created_at: key.created_at,
            expires_at: key.expires_at,
            overdue: key.expires_at.is_some_and(|expires_at| now >= expires_at),
            usage: key.usage.snapshot(),
        });
        let retired = ring
            .retired_by_age()
            .into_iter()
            .map(|(kid, key)| RetiredKeyStatus {
                kid: kid.clone(),
                archived_at: key.archived_at,
                expires_at: key.expires_at,
                expired: key.is_expired_at(now),
                usage: key.usage.snapshot(),
            })
            .collect();

        KeyStoreStatus { current, retired }
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.ring.read();
        f.debug_struct("KeyStore")
            .field("current", &ring.current.as_ref().map(|key| key.kid.as_str()))
            .field("retired", &ring.retired.keys().collect::<Vec<_>>())
            .field("max_retired", &self.max_retired)
            .finish()
    }
}
