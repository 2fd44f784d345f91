//! # Infrastructure Layer
//!
//! Concrete adapters for the token authority core:
//! - **Config source**: file-backed token configuration with environment
//!   overrides and change polling
//! - **Policy store**: in-memory policy tuples with optional JSON persistence

pub mod config_source;
pub mod policy;

pub use config_source::{load_app_config, load_token_config, FileConfigSource};
pub use policy::MemoryPolicyStore;
