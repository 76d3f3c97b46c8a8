//! Client error types.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The API refused the upload; carries its `error` message.
    #[error("{0}")]
    UploadRejected(String),

    #[error("Task not found")]
    NotFound,

    #[error("API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to read photo: {0}")]
    Io(#[from] std::io::Error),
}
