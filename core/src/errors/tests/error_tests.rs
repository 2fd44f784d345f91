//! Unit tests for error classification

use crate::errors::{DomainError, PolicyError, TokenError, TokenErrorKind};

#[test]
fn test_verification_errors_are_distinguishable() {
    let errors = [
        TokenError::MalformedToken,
        TokenError::TokenExpired,
        TokenError::TokenNotYetValid,
        TokenError::InvalidToken {
            reason: "bad signature".to_string(),
        },
    ];

    let kinds: Vec<TokenErrorKind> = errors.iter().map(TokenError::kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenErrorKind::Malformed,
            TokenErrorKind::Expired,
            TokenErrorKind::NotYetValid,
            TokenErrorKind::Invalid,
        ]
    );
    assert!(errors.iter().all(TokenError::is_verification_error));
}

#[test]
fn test_only_time_window_errors_are_renewable() {
    assert!(TokenError::TokenExpired.is_renewable());
    assert!(TokenError::TokenNotYetValid.is_renewable());
    assert!(!TokenError::MalformedToken.is_renewable());
    assert!(!TokenError::invalid("forged").is_renewable());
}

#[test]
fn test_configuration_errors_classified_as_config() {
    let errors = [
        TokenError::UnsupportedAlgorithm {
            algorithm: "ES256".to_string(),
        },
        TokenError::SecretTooShort {
            minimum: 32,
            actual: 8,
        },
        TokenError::KeyPairMismatch,
        TokenError::key_parse("not a PEM"),
        TokenError::config("issuer is required"),
    ];

    for error in &errors {
        assert_eq!(error.kind(), TokenErrorKind::Config, "{error}");
        assert!(!error.is_verification_error());
    }
}

#[test]
fn test_error_messages() {
    let err = TokenError::SecretTooShort {
        minimum: 32,
        actual: 10,
    };
    assert_eq!(
        err.to_string(),
        "HMAC secret too short: 10 bytes (minimum 32)"
    );
    assert_eq!(TokenError::TokenExpired.to_string(), "Token expired");
}

#[test]
fn test_domain_error_bridges_transparently() {
    let err: DomainError = TokenError::TokenExpired.into();
    assert!(matches!(err, DomainError::Token(TokenError::TokenExpired)));
    assert_eq!(err.to_string(), "Token expired");

    let err: DomainError = PolicyError::EmptyParameters.into();
    assert_eq!(err.to_string(), "Policy parameters must not be empty");
}
