//! Domain layer containing token claims and policy tuples.

pub mod entities;

// Re-export commonly used domain types
pub use entities::*;
