//! Domain-specific error types and error handling.

mod types;

pub use types::{ConfigSourceError, PolicyError, TokenError, TokenErrorKind};

use thiserror::Error;

/// Any error raised by the core, for callers that do not need to tell them apart
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    ConfigSource(#[from] ConfigSourceError),
}

#[cfg(test)]
mod tests;
