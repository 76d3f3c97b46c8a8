//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage: {0}")]
    ConfigError(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid task id: {0}")]
    InvalidTaskId(String),

    #[error("Corrupt status record for {task_id}: {source}")]
    CorruptRecord {
        task_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }
}
