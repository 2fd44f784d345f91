pub mod policy;

pub use policy::PolicyEnforcer;

#[cfg(test)]
pub use policy::MockPolicyEnforcer;
