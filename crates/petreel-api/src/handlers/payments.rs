//! Payment handlers: pass-through to Stripe payment intents.
//!
//! These routes answer with their own `{success, error, details}` envelope
//! rather than [`ApiError`](crate::error::ApiError).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use petreel_payments::PaymentError;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub email: Option<String>,
    pub dog_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub success: bool,
    pub client_secret: Option<String>,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dog_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// Failure envelope of the payment routes.
#[derive(Debug, Serialize)]
pub struct PaymentFailure {
    pub success: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PaymentFailure {
    fn response(status: StatusCode, error: &'static str, details: Option<String>) -> Response {
        (
            status,
            Json(Self {
                success: false,
                error,
                details,
            }),
        )
            .into_response()
    }
}

/// Create a payment intent for one video.
///
/// A missing or malformed body is treated as an empty one; every field is
/// optional.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    body: Option<Json<CreatePaymentIntentRequest>>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    match state
        .payments
        .create_intent(request.email.as_deref(), request.dog_name.as_deref())
        .await
    {
        Ok(intent) => {
            metrics::record_payment_intent("created");
            Json(CreatePaymentIntentResponse {
                success: true,
                client_secret: intent.client_secret,
                amount: intent.amount,
                currency: intent.currency,
            })
            .into_response()
        }
        Err(e) => {
            error!("Failed to create payment intent: {}", e);
            metrics::record_payment_intent("failed");
            PaymentFailure::response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create payment intent",
                Some(failure_details(&e)),
            )
        }
    }
}

/// Check whether a payment intent has succeeded.
pub async fn verify_payment(
    State(state): State<AppState>,
    body: Option<Json<VerifyPaymentRequest>>,
) -> Response {
    let intent_id = body
        .and_then(|Json(r)| r.payment_intent_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let Some(intent_id) = intent_id else {
        return PaymentFailure::response(
            StatusCode::BAD_REQUEST,
            "Payment intent ID is required",
            None,
        );
    };

    match state.payments.retrieve_intent(&intent_id).await {
        Ok(intent) => {
            metrics::record_payment_verification(&intent.status);
            if intent.succeeded() {
                info!(payment_intent = %intent.id, "Payment verified");
                Json(VerifyPaymentResponse {
                    success: true,
                    amount: Some(intent.amount),
                    email: intent.metadata_value("email").map(str::to_string),
                    dog_name: intent.metadata_value("dogName").map(str::to_string),
                    payment_status: intent.status,
                    error: None,
                })
                .into_response()
            } else {
                Json(VerifyPaymentResponse {
                    success: false,
                    payment_status: intent.status,
                    amount: None,
                    email: None,
                    dog_name: None,
                    error: Some("Payment not completed"),
                })
                .into_response()
            }
        }
        Err(e) => {
            error!(payment_intent = %intent_id, "Failed to verify payment: {}", e);
            PaymentFailure::response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to verify payment",
                Some(failure_details(&e)),
            )
        }
    }
}

/// Details string for a payment failure. Processor messages are passed
/// through; transport errors are summarized.
fn failure_details(err: &PaymentError) -> String {
    match err {
        PaymentError::Stripe { message, .. } => message.clone(),
        PaymentError::NotConfigured(_) => "Payment processor not configured".to_string(),
        PaymentError::Network(_) => "Payment processor unreachable".to_string(),
        PaymentError::InvalidResponse(_) | PaymentError::Json(_) => {
            "Unexpected response from payment processor".to_string()
        }
    }
}
