//! Stripe REST client for payment intents.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{PaymentError, PaymentResult};

/// Product tag stored in intent metadata.
pub const PRODUCT_TAG: &str = "dog-birthday-video";

/// Configuration for the payment client.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Stripe secret key; payment routes fail when unset
    pub secret_key: Option<String>,
    /// Stripe API base URL
    pub api_base: String,
    /// Fixed price in minor units
    pub amount: u64,
    pub currency: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for transient failures
    pub max_retries: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.stripe.com".to_string(),
            amount: 499,
            currency: "usd".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl PaymentConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            api_base: std::env::var("STRIPE_API_BASE").unwrap_or(defaults.api_base),
            amount: std::env::var("PAYMENT_AMOUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.amount),
            currency: std::env::var("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.currency),
            timeout: Duration::from_secs(
                std::env::var("STRIPE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("STRIPE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }
}

/// The parts of a Stripe payment intent this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Client for the Stripe payment intents API.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: PaymentConfig,
}

impl StripeClient {
    pub fn new(config: PaymentConfig) -> PaymentResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(PaymentError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(PaymentConfig::from_env())
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    fn secret_key(&self) -> PaymentResult<&str> {
        self.config
            .secret_key
            .as_deref()
            .ok_or_else(|| PaymentError::NotConfigured("STRIPE_SECRET_KEY not set".to_string()))
    }

    /// Create a payment intent for one video at the configured price.
    pub async fn create_intent(
        &self,
        email: Option<&str>,
        dog_name: Option<&str>,
    ) -> PaymentResult<PaymentIntent> {
        let key = self.secret_key()?;
        let url = format!("{}/v1/payment_intents", self.config.api_base.trim_end_matches('/'));

        let email = non_blank(email).unwrap_or("unknown");
        let dog_name_meta = non_blank(dog_name).unwrap_or("unknown");
        let description = format!(
            "Dog Birthday Video for {}",
            non_blank(dog_name).unwrap_or("your pup")
        );
        let amount = self.config.amount.to_string();

        let params = [
            ("amount", amount.as_str()),
            ("currency", self.config.currency.as_str()),
            ("description", description.as_str()),
            ("metadata[email]", email),
            ("metadata[dogName]", dog_name_meta),
            ("metadata[product]", PRODUCT_TAG),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        // Same key on every attempt so a retried create never double-charges.
        let idempotency_key = uuid::Uuid::new_v4().to_string();

        debug!("Creating payment intent at {}", url);
        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(key)
                    .header("Idempotency-Key", &idempotency_key)
                    .form(&params)
                    .send()
                    .await
                    .map_err(PaymentError::Network)?;
                check_status(response).await
            })
            .await?;

        let intent: PaymentIntent = response.json().await?;
        info!(payment_intent = %intent.id, amount = intent.amount, "Created payment intent");
        Ok(intent)
    }

    /// Fetch a payment intent by id.
    pub async fn retrieve_intent(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        let key = self.secret_key()?;
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base.trim_end_matches('/'),
            urlencoding::encode(intent_id)
        );

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(key)
                    .send()
                    .await
                    .map_err(PaymentError::Network)?;
                check_status(response).await
            })
            .await?;

        let intent: PaymentIntent = response.json().await?;
        debug!(payment_intent = %intent.id, status = %intent.status, "Retrieved payment intent");
        Ok(intent)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> PaymentResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = PaymentResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    warn!(
                        "Stripe request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn check_status(response: Response) -> PaymentResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<StripeErrorBody>(&body) {
        Ok(parsed) => parsed
            .error
            .message
            .or(parsed.error.kind)
            .unwrap_or_else(|| status.to_string()),
        Err(_) => body,
    };
    Err(PaymentError::Stripe {
        status: status.as_u16(),
        message,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_price() {
        let config = PaymentConfig::default();
        assert_eq!(config.amount, 499);
        assert_eq!(config.currency, "usd");
    }

    #[test]
    fn test_retryable() {
        assert!(PaymentError::Stripe { status: 503, message: String::new() }.is_retryable());
        assert!(PaymentError::Stripe { status: 429, message: String::new() }.is_retryable());
        assert!(!PaymentError::Stripe { status: 402, message: String::new() }.is_retryable());
        assert!(!PaymentError::NotConfigured(String::new()).is_retryable());
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = StripeClient::new(PaymentConfig::default()).unwrap();
        assert!(matches!(
            client.create_intent(None, None).await,
            Err(PaymentError::NotConfigured(_))
        ));
    }
}
