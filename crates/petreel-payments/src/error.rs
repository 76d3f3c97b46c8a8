//! Payment client error types.

use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment processor not configured: {0}")]
    NotConfigured(String),

    #[error("Stripe returned {status}: {message}")]
    Stripe { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Network(e) => e.is_timeout() || e.is_connect(),
            PaymentError::Stripe { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
