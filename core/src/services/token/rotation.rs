//! Scheduled signing key rotation
//!
//! Rotation generates an RSA key, which is CPU bound, so each rotation runs on
//! the blocking pool. The background loop ticks at the configured interval and
//! stops when its cancellation token fires.

use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::TokenError;

use super::clock::Clock;
use super::key_store::{KeyStore, RotationOutcome, RotationPolicy};
use super::keys::KeyGenerator;

/// Everything one rotation needs
#[derive(Clone)]
pub(crate) struct Rotator {
    store: Arc<KeyStore>,
    generator: Arc<dyn KeyGenerator>,
    clock: Arc<dyn Clock>,
    policy: RotationPolicy,
}

impl Rotator {
    pub(crate) fn new(
        store: Arc<KeyStore>,
        generator: Arc<dyn KeyGenerator>,
        clock: Arc<dyn Clock>,
        policy: RotationPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            policy,
        }
    }

    /// Runs a single rotation on the blocking pool.
    ///
    /// A panic inside the rotation surfaces as [`TokenError::RotationAborted`];
    /// the write lock is released on unwind and the ring is left untouched.
    pub(crate) async fn rotate_once(&self) -> Result<RotationOutcome, TokenError> {
        let rotator = self.clone();
        let result = tokio::task::spawn_blocking(move || {
            let now = rotator.clock.now();
            rotator
                .store
                .rotate(rotator.generator.as_ref(), now, &rotator.policy)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => Err(TokenError::RotationAborted {
                message: format!("rotation panicked: {}", panic_message(join_err.into_panic())),
            }),
            Err(_) => Err(TokenError::RotationAborted {
                message: "rotation task was cancelled".to_string(),
            }),
        }
    }

    /// Starts the background loop
    pub(crate) fn spawn(self, interval: std::time::Duration) -> RotationHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(interval, token).await });

        RotationHandle { cancel, task }
    }

    async fn run(self, interval: std::time::Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the startup key is already installed.
        ticker.tick().await;

        info!(
            "Key rotation started - will rotate every {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Key rotation stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.rotate_once().await {
                        Ok(outcome) => log_outcome(&outcome),
                        Err(TokenError::RotationAborted { message }) => {
                            error!("Key rotation task failed, scheduled rotation halted: {}", message);
                            break;
                        }
                        Err(e) => {
                            warn!("Key rotation failed, keeping current key: {}", e);
                        }
                    }
                }
            }
        }
    }
}

pub(crate) fn log_outcome(outcome: &RotationOutcome) {
    info!(
        previous_kid = outcome.previous_kid.as_deref().unwrap_or(""),
        current_kid = %outcome.current_kid,
        retired = outcome.retired_count,
        "Signing key rotated"
    );
    for kid in &outcome.evicted {
        debug!(kid = %kid, "Retired signing key dropped");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a running rotation loop
#[derive(Debug)]
pub struct RotationHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RotationHandle {
    /// Signals the loop to stop without waiting for it
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop and waits for it to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!("Key rotation task panicked: {}", panic_message(e.into_panic()));
            }
        }
    }
}
