//! Domain entities representing core business objects.

pub mod claims;
pub mod policy;

// Re-export commonly used types
pub use claims::Claims;
pub use policy::{PolicyOperation, PolicyType, DEPARTMENT_INHERITANCE, DOMAIN_MEMBER};
