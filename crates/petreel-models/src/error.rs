//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Missing required fields (dogPhoto, message, or email)")]
    MissingFields,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Unsupported photo type: {0}")]
    UnsupportedPhoto(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
