//! Tests for the background rotation loop

use chrono::Duration;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use super::mocks::*;
use crate::services::token::rotation::Rotator;
use crate::services::token::{
    parse_private_key_pem, KeyGenerator, KeyStore, RotationPolicy, SystemClock,
};

const TICK: StdDuration = StdDuration::from_millis(50);

fn store() -> Arc<KeyStore> {
    let store = KeyStore::new(3);
    let key = parse_private_key_pem(PRIVATE_KEY_PKCS1).unwrap();
    store.initialize(key, start_time(), None).unwrap();
    Arc::new(store)
}

fn rotator(store: &Arc<KeyStore>, generator: Arc<dyn KeyGenerator>) -> Rotator {
    Rotator::new(
        Arc::clone(store),
        generator,
        Arc::new(SystemClock),
        RotationPolicy {
            retention: Duration::hours(1),
            active_lifetime: None,
        },
    )
}

#[tokio::test]
async fn test_loop_rotates_on_schedule() {
    let store = store();
    // Fill the key pool up front so generation fits inside a tick
    PooledKeyGenerator::new().generate().unwrap();
    let generator = Arc::new(PooledKeyGenerator::new());
    let handle = rotator(&store, generator.clone()).spawn(TICK);

    // Ticks land at 50ms and 100ms; the immediate first tick is skipped
    tokio::time::sleep(StdDuration::from_millis(130)).await;
    assert!(!handle.is_finished());
    handle.stop().await;

    let rotations = generator.calls();
    assert!(rotations >= 1, "expected at least one rotation");
    assert_ne!(store.current_key_id().as_deref(), Some(PUBLIC_KEY_ID));
    assert_eq!(store.retired_count(), rotations.min(3));

    tokio::time::sleep(TICK * 3).await;
    assert_eq!(generator.calls(), rotations);
}

#[tokio::test]
async fn test_loop_survives_generation_failures() {
    let store = store();
    let handle = rotator(&store, Arc::new(FailingKeyGenerator)).spawn(TICK);

    tokio::time::sleep(TICK * 3).await;

    assert!(!handle.is_finished());
    assert_eq!(store.current_key_id().as_deref(), Some(PUBLIC_KEY_ID));
    handle.stop().await;
}

#[tokio::test]
async fn test_loop_halts_after_panic() {
    let store = store();
    let handle = rotator(&store, Arc::new(PanickingKeyGenerator)).spawn(TICK);

    tokio::time::sleep(TICK * 4).await;

    assert!(handle.is_finished());
    assert_eq!(store.current_key_id().as_deref(), Some(PUBLIC_KEY_ID));
    assert_eq!(store.retired_count(), 0);
}

#[tokio::test]
async fn test_cancel_before_first_tick_rotates_nothing() {
    let store = store();
    let generator = Arc::new(PooledKeyGenerator::new());
    let handle = rotator(&store, generator.clone()).spawn(StdDuration::from_secs(60));

    handle.stop().await;

    assert_eq!(generator.calls(), 0);
    assert_eq!(store.current_key_id().as_deref(), Some(PUBLIC_KEY_ID));
}

#[tokio::test]
async fn test_manager_rotation_lifecycle() {
    let config = rsa_config().with_key_rotation(3600);
    let (manager, _clock, _generator) = rsa_manager(&config);

    assert!(!manager.is_rotation_running());
    assert!(manager.start_rotation());
    assert!(manager.is_rotation_running());
    // Second start is a no-op
    assert!(manager.start_rotation());

    manager.shutdown().await;
    assert!(!manager.is_rotation_running());

    // Restartable after shutdown
    assert!(manager.start_rotation());
    manager.shutdown().await;
}

#[tokio::test]
async fn test_manager_without_interval_does_not_schedule() {
    let (manager, _clock, _generator) = rsa_manager(&rsa_config());

    assert!(!manager.start_rotation());
    assert!(!manager.is_rotation_running());
    manager.shutdown().await;
}

#[test]
fn test_manager_rotation_needs_runtime() {
    let config = rsa_config().with_key_rotation(3600);
    let (manager, _clock, generator) = rsa_manager(&config);

    assert!(!manager.start_rotation());
    assert!(!manager.is_rotation_running());
    assert_eq!(generator.calls(), 0);
}
