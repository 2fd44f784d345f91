//! Mock implementation of PolicyEnforcer for testing

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::PolicyType;
use crate::errors::PolicyError;

use super::r#trait::PolicyEnforcer;

/// In-memory policy enforcer recording calls
#[derive(Default)]
pub struct MockPolicyEnforcer {
    tuples: Arc<RwLock<HashSet<(PolicyType, Vec<String>)>>>,
    add_calls: AtomicUsize,
    save_calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockPolicyEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a store error
    pub fn fail_with_store_error(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.tuples.read().await.len()
    }

    fn check_failure(&self) -> Result<(), PolicyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PolicyError::Store {
                message: "policy backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyEnforcer for MockPolicyEnforcer {
    async fn has_policy(&self, policy_type: PolicyType, params: &[String]) -> Result<bool, PolicyError> {
        self.check_failure()?;
        let tuples = self.tuples.read().await;
        Ok(tuples.contains(&(policy_type, params.to_vec())))
    }

    async fn add_policy(&self, policy_type: PolicyType, params: &[String]) -> Result<bool, PolicyError> {
        self.check_failure()?;
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let mut tuples = self.tuples.write().await;
        Ok(tuples.insert((policy_type, params.to_vec())))
    }

    async fn save_policy(&self) -> Result<(), PolicyError> {
        self.check_failure()?;
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
