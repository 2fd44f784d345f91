//! # Token Authority Core
//!
//! Token issuance, verification and signing key rotation for the token
//! authority. This crate contains the domain types (claims, policy tuples),
//! the token services, the collaborator interfaces (policy engine,
//! configuration source) and the error types shared by the other crates.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
