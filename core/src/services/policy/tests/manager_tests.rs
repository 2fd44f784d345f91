//! Tests for policy tuple management

use crate::domain::{PolicyOperation, PolicyType};
use crate::errors::PolicyError;
use crate::repositories::policy::MockPolicyEnforcer;
use crate::repositories::PolicyEnforcer;
use crate::services::policy::PolicyManager;

fn manager() -> PolicyManager<MockPolicyEnforcer> {
    PolicyManager::new(MockPolicyEnforcer::new())
}

fn params(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_apply_policy_adds_then_checks() {
    let manager = manager();
    let add = PolicyOperation::add(PolicyType::Policy, ["admin", "acme", "/orders", "read"]);
    let check = PolicyOperation::check(PolicyType::Policy, ["admin", "acme", "/orders", "read"]);

    assert!(!manager.apply_policy(&check).await.unwrap());
    assert!(manager.apply_policy(&add).await.unwrap());
    assert!(manager.apply_policy(&check).await.unwrap());
    // Re-adding reports no change
    assert!(!manager.apply_policy(&add).await.unwrap());
}

#[tokio::test]
async fn test_apply_policy_by_textual_type() {
    let manager = manager();

    for policy_type in ["p", "policy", "g", "grouping", "g2", "grouping2"] {
        let op = PolicyOperation::parse(policy_type, ["a", "b", "c"], false).unwrap();
        manager.apply_policy(&op).await.unwrap();
    }

    // Aliases collapse onto three sections
    assert_eq!(manager.enforcer().len().await, 3);
}

#[tokio::test]
async fn test_apply_policy_rejects_empty_params() {
    let manager = manager();
    let op = PolicyOperation::add(PolicyType::Grouping, Vec::<String>::new());

    assert_eq!(
        manager.apply_policy(&op).await.unwrap_err(),
        PolicyError::EmptyParameters
    );
}

#[tokio::test]
async fn test_helpers_are_idempotent() {
    let manager = manager();

    assert!(manager.add_policy("admin", "acme", "/orders", "write").await.unwrap());
    assert!(!manager.add_policy("admin", "acme", "/orders", "write").await.unwrap());
    assert!(manager.add_user_role("alice", "admin", "acme").await.unwrap());
    assert!(!manager.add_user_role("alice", "admin", "acme").await.unwrap());

    // The duplicate calls never reached add
    assert_eq!(manager.enforcer().add_calls(), 2);
}

#[tokio::test]
async fn test_domain_relations() {
    let manager = manager();

    manager.add_domain_member("acme").await.unwrap();
    manager.add_department_inheritance("acme-sales", "acme").await.unwrap();
    manager
        .add_domain_inheritance("acme-eu", "acme", "region")
        .await
        .unwrap();

    let enforcer = manager.enforcer();
    assert!(enforcer
        .has_policy(PolicyType::Grouping2, &params(&["acme", "acme", "domain_member"]))
        .await
        .unwrap());
    assert!(enforcer
        .has_policy(
            PolicyType::Grouping2,
            &params(&["acme-sales", "acme", "department_inheritance"])
        )
        .await
        .unwrap());
    assert!(enforcer
        .has_policy(PolicyType::Grouping2, &params(&["acme-eu", "acme", "region"]))
        .await
        .unwrap());
    assert!(!enforcer
        .has_policy(PolicyType::Grouping, &params(&["acme-eu", "acme", "region"]))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_helpers_reject_blank_fields() {
    let manager = manager();

    assert_eq!(
        manager.add_user_role("alice", "", "acme").await.unwrap_err(),
        PolicyError::EmptyParameters
    );
    assert_eq!(manager.enforcer().add_calls(), 0);
}

#[tokio::test]
async fn test_store_errors_propagate() {
    let manager = manager();
    manager.enforcer().fail_with_store_error();

    assert!(matches!(
        manager.add_policy("admin", "acme", "/", "read").await,
        Err(PolicyError::Store { .. })
    ));
    assert!(matches!(
        manager.save_policies().await,
        Err(PolicyError::Store { .. })
    ));
}

#[tokio::test]
async fn test_save_policies() {
    let manager = manager();
    manager.save_policies().await.unwrap();
    assert_eq!(manager.enforcer().save_calls(), 1);
}
