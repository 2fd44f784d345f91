//! Policy enforcer trait: the seam to the external policy engine.

use async_trait::async_trait;

use crate::domain::PolicyType;
use crate::errors::PolicyError;

/// Tuple store of the policy engine
///
/// The token authority only shapes and forwards tuples; evaluating them is the
/// engine's job. Tuples are addressed by section (`p`, `g`, `g2`).
#[async_trait]
pub trait PolicyEnforcer: Send + Sync {
    /// Check whether a tuple exists in a section
    ///
    /// # Returns
    /// * `Ok(true)` - Tuple present
    /// * `Ok(false)` - Tuple absent
    /// * `Err(PolicyError)` - Engine failure
    async fn has_policy(&self, policy_type: PolicyType, params: &[String]) -> Result<bool, PolicyError>;

    /// Add a tuple to a section
    ///
    /// # Returns
    /// * `Ok(true)` - Tuple was added
    /// * `Ok(false)` - Tuple already existed; nothing changed
    /// * `Err(PolicyError)` - Engine failure
    async fn add_policy(&self, policy_type: PolicyType, params: &[String]) -> Result<bool, PolicyError>;

    /// Persist all tuples to the engine's backing store
    async fn save_policy(&self) -> Result<(), PolicyError>;
}
