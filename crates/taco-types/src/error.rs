//! Error types for resource validation and credential secrets

use thiserror::Error;

/// Errors raised when a secret does not carry the data a typed view needs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// A required key is absent from the secret
    #[error("secret {secret} is missing key '{key}'")]
    MissingKey { secret: String, key: String },

    /// A value is present but not valid UTF-8
    #[error("secret {secret} key '{key}' is not valid UTF-8")]
    InvalidUtf8 { secret: String, key: String },
}

/// Schema violations rejected before an order is stored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("spec.quantity must be at least 1, got {0}")]
    QuantityTooLow(u32),

    #[error("spec.{0} must not be empty")]
    EmptyField(&'static str),
}
