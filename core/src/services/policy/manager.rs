use tracing::{debug, info};

use crate::domain::{PolicyOperation, PolicyType, DEPARTMENT_INHERITANCE, DOMAIN_MEMBER};
use crate::errors::PolicyError;
use crate::repositories::PolicyEnforcer;

/// Shapes role, permission and domain tuples and hands them to the enforcer
pub struct PolicyManager<E: PolicyEnforcer> {
    enforcer: E,
}

impl<E: PolicyEnforcer> PolicyManager<E> {
    pub fn new(enforcer: E) -> Self {
        Self { enforcer }
    }

    pub fn enforcer(&self) -> &E {
        &self.enforcer
    }

    /// Checks or adds a single tuple.
    ///
    /// # Returns
    /// * `check_exist` set: whether the tuple exists
    /// * otherwise: whether the tuple was newly added
    pub async fn apply_policy(&self, op: &PolicyOperation) -> Result<bool, PolicyError> {
        if op.params.is_empty() {
            return Err(PolicyError::EmptyParameters);
        }

        if op.check_exist {
            self.enforcer.has_policy(op.policy_type, &op.params).await
        } else {
            let added = self.enforcer.add_policy(op.policy_type, &op.params).await?;
            debug!(section = %op.policy_type, params = ?op.params, added, "Applied policy tuple");
            Ok(added)
        }
    }

    /// Persists all tuples through the enforcer
    pub async fn save_policies(&self) -> Result<(), PolicyError> {
        self.enforcer.save_policy().await?;
        info!("Policies saved");
        Ok(())
    }

    /// Grants `role` the `action` on `path` within `domain` (`p` tuple)
    pub async fn add_policy(
        &self,
        role: &str,
        domain: &str,
        path: &str,
        action: &str,
    ) -> Result<bool, PolicyError> {
        self.ensure(PolicyType::Policy, [role, domain, path, action])
            .await
    }

    /// Assigns `role` to `user` within `domain` (`g` tuple)
    pub async fn add_user_role(&self, user: &str, role: &str, domain: &str) -> Result<bool, PolicyError> {
        self.ensure(PolicyType::Grouping, [user, role, domain]).await
    }

    /// Links `child` to `parent` under `relation` (`g2` tuple)
    pub async fn add_domain_inheritance(
        &self,
        child: &str,
        parent: &str,
        relation: &str,
    ) -> Result<bool, PolicyError> {
        self.ensure(PolicyType::Grouping2, [child, parent, relation])
            .await
    }

    /// Makes a department inherit from its company
    pub async fn add_department_inheritance(
        &self,
        department: &str,
        company: &str,
    ) -> Result<bool, PolicyError> {
        self.add_domain_inheritance(department, company, DEPARTMENT_INHERITANCE)
            .await
    }

    /// Registers a domain as a member of itself
    pub async fn add_domain_member(&self, domain: &str) -> Result<bool, PolicyError> {
        self.add_domain_inheritance(domain, domain, DOMAIN_MEMBER)
            .await
    }

    /// Adds the tuple unless it already exists; returns whether it was added
    async fn ensure<const N: usize>(
        &self,
        policy_type: PolicyType,
        params: [&str; N],
    ) -> Result<bool, PolicyError> {
        if params.iter().any(|param| param.is_empty()) {
            return Err(PolicyError::EmptyParameters);
        }

        let exists = self
            .apply_policy(&PolicyOperation::check(policy_type, params))
            .await?;
        if exists {
            return Ok(false);
        }
        self.apply_policy(&PolicyOperation::add(policy_type, params))
            .await
    }
}
