//! Policy tuples handed to the external policy engine.
//!
//! The token authority never evaluates these rules; it only shapes tuples
//! and hands them to a [`PolicyEnforcer`](crate::repositories::PolicyEnforcer).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::PolicyError;

/// Relation name for a domain's membership of itself
pub const DOMAIN_MEMBER: &str = "domain_member";

/// Relation name for department → company inheritance
pub const DEPARTMENT_INHERITANCE: &str = "department_inheritance";

/// Policy section a tuple belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyType {
    /// Permission rule: `{role, domain, resource, action}`
    #[serde(rename = "p", alias = "policy")]
    Policy,
    /// Role assignment: `{user, role, domain}`
    #[serde(rename = "g", alias = "grouping")]
    Grouping,
    /// Domain relation: `{child, parent, relation}`
    #[serde(rename = "g2", alias = "grouping2")]
    Grouping2,
}

impl PolicyType {
    /// Section name used by the policy engine
    pub fn section(&self) -> &'static str {
        match self {
            PolicyType::Policy => "p",
            PolicyType::Grouping => "g",
            PolicyType::Grouping2 => "g2",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

impl FromStr for PolicyType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p" | "policy" => Ok(PolicyType::Policy),
            "g" | "grouping" => Ok(PolicyType::Grouping),
            "g2" | "grouping2" => Ok(PolicyType::Grouping2),
            other => Err(PolicyError::UnsupportedPolicyType {
                policy_type: other.to_string(),
            }),
        }
    }
}

/// A single apply-or-check request against the policy store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOperation {
    pub policy_type: PolicyType,
    pub params: Vec<String>,
    /// Only check for the tuple instead of adding it
    pub check_exist: bool,
}

impl PolicyOperation {
    /// Operation that adds a tuple
    pub fn add<I, S>(policy_type: PolicyType, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy_type,
            params: params.into_iter().map(Into::into).collect(),
            check_exist: false,
        }
    }

    /// Operation that only checks for a tuple
    pub fn check<I, S>(policy_type: PolicyType, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            check_exist: true,
            ..Self::add(policy_type, params)
        }
    }

    /// Builds an operation from a textual policy type (`p`, `policy`, `g`, ...)
    pub fn parse<I, S>(policy_type: &str, params: I, check_exist: bool) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let policy_type = policy_type.parse()?;
        Ok(Self {
            check_exist,
            ..Self::add(policy_type, params)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_type_aliases() {
        assert_eq!("p".parse::<PolicyType>().unwrap(), PolicyType::Policy);
        assert_eq!("policy".parse::<PolicyType>().unwrap(), PolicyType::Policy);
        assert_eq!("grouping".parse::<PolicyType>().unwrap(), PolicyType::Grouping);
        assert_eq!("g2".parse::<PolicyType>().unwrap(), PolicyType::Grouping2);
        assert_eq!(PolicyType::Grouping2.to_string(), "g2");
    }

    #[test]
    fn test_unknown_policy_type() {
        let err = PolicyOperation::parse("g3", ["a"], false).unwrap_err();
        assert_eq!(
            err,
            PolicyError::UnsupportedPolicyType {
                policy_type: "g3".to_string()
            }
        );
    }

    #[test]
    fn test_check_operation() {
        let op = PolicyOperation::check(PolicyType::Grouping, ["alice", "admin", "acme"]);
        assert!(op.check_exist);
        assert_eq!(op.params, vec!["alice", "admin", "acme"]);
    }
}
