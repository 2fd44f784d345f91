//! Configuration source implementations

pub mod file;

pub use file::{load_app_config, load_token_config, FileConfigSource};
