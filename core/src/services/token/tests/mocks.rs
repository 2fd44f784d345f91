//! Test doubles and fixtures for token tests

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rsa::RsaPrivateKey;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use ta_shared::TokenConfig;

use crate::errors::TokenError;
use crate::services::token::{KeyGenerator, ManualClock, RsaKeyGenerator, TokenManager};

pub const PRIVATE_KEY_PKCS1: &str = include_str!("fixtures/a_pkcs1.pem");
pub const PRIVATE_KEY_PKCS8: &str = include_str!("fixtures/a_pkcs8.pem");
pub const PUBLIC_KEY: &str = include_str!("fixtures/a_pub.pem");
pub const PUBLIC_KEY_ID: &str = "lEbVkzguVgVizvS6puGBSA";

pub const OTHER_PRIVATE_KEY: &str = include_str!("fixtures/b_pkcs1.pem");
pub const OTHER_PUBLIC_KEY: &str = include_str!("fixtures/b_pub.pem");
pub const OTHER_PUBLIC_KEY_ID: &str = "5-_TKsvUqfhn-2RdkQbxxg";

pub const WEAK_PRIVATE_KEY: &str = include_str!("fixtures/weak_pkcs1.pem");
pub const WEAK_PUBLIC_KEY: &str = include_str!("fixtures/weak_pub.pem");

pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const ISSUER: &str = "svc-auth";
pub const AUDIENCE: &str = "svc-api";

const POOL_SIZE: usize = 6;

/// Fixed start time for clock-driven tests
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

/// Keys generated once per test binary; RSA generation is too slow to repeat
fn key_pool() -> &'static [RsaPrivateKey] {
    static POOL: OnceLock<Vec<RsaPrivateKey>> = OnceLock::new();
    POOL.get_or_init(|| {
        let generator = RsaKeyGenerator::default();
        (0..POOL_SIZE)
            .map(|_| generator.generate().expect("key generation"))
            .collect()
    })
}

/// Hands out pre-generated keys in order
#[derive(Debug, Default)]
pub struct PooledKeyGenerator {
    next: AtomicUsize,
}

impl PooledKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys handed out so far
    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl KeyGenerator for PooledKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError> {
        let pool = key_pool();
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(pool[index % pool.len()].clone())
    }
}

/// Hands out the given keys in order, then falls back to the shared pool
pub struct SequenceKeyGenerator {
    keys: Mutex<VecDeque<RsaPrivateKey>>,
    fallback: PooledKeyGenerator,
}

impl SequenceKeyGenerator {
    pub fn new(pems: &[&str]) -> Self {
        let keys = pems
            .iter()
            .map(|pem| crate::services::token::parse_private_key_pem(pem).unwrap())
            .collect();
        Self {
            keys: Mutex::new(keys),
            fallback: PooledKeyGenerator::new(),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError> {
        match self.keys.lock().pop_front() {
            Some(key) => Ok(key),
            None => self.fallback.generate(),
        }
    }
}

/// Always fails
#[derive(Debug, Default)]
pub struct FailingKeyGenerator;

impl KeyGenerator for FailingKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError> {
        Err(TokenError::KeyGeneration {
            message: "entropy source unavailable".to_string(),
        })
    }
}

/// Panics on every call
#[derive(Debug, Default)]
pub struct PanickingKeyGenerator;

impl KeyGenerator for PanickingKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError> {
        panic!("key generator exploded")
    }
}

/// Returns the same fixture key every time
#[derive(Debug, Default)]
pub struct FixedKeyGenerator;

impl KeyGenerator for FixedKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, TokenError> {
        crate::services::token::parse_private_key_pem(PRIVATE_KEY_PKCS1)
    }
}

pub fn hmac_config() -> TokenConfig {
    TokenConfig::hmac(TEST_SECRET, ISSUER).with_audience(vec![AUDIENCE.to_string()])
}

pub fn rsa_config() -> TokenConfig {
    TokenConfig::rsa(PRIVATE_KEY_PKCS1, PUBLIC_KEY, ISSUER)
        .with_audience(vec![AUDIENCE.to_string()])
}

/// RS256 manager on a manual clock with pooled key generation
pub fn rsa_manager(config: &TokenConfig) -> (TokenManager, Arc<ManualClock>, Arc<PooledKeyGenerator>) {
    let clock = manual_clock();
    let generator = Arc::new(PooledKeyGenerator::new());
    let manager = TokenManager::with_components(config, clock.clone(), generator.clone())
        .expect("manager should build");
    (manager, clock, generator)
}

pub fn hmac_manager(config: &TokenConfig) -> (TokenManager, Arc<ManualClock>) {
    let clock = manual_clock();
    let manager = TokenManager::with_components(
        config,
        clock.clone(),
        Arc::new(FailingKeyGenerator),
    )
    .expect("manager should build");
    (manager, clock)
}
