//! Shared configuration types for the token authority
//!
//! This crate holds the serde-facing configuration consumed by the core,
//! the infrastructure adapters and the daemon.

pub mod config;

pub use config::{
    AppConfig, ConfigSourceSettings, Environment, LogFormat, LoggingConfig, PolicyStoreConfig,
    TokenConfig,
};
