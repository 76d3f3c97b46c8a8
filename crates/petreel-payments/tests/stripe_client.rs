//! Stripe client tests against a mock Stripe API.

use petreel_payments::{PaymentConfig, PaymentError, StripeClient};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> StripeClient {
    StripeClient::new(PaymentConfig {
        secret_key: Some("sk_test_123".into()),
        api_base: server.uri(),
        max_retries: 1,
        ..PaymentConfig::default()
    })
    .unwrap()
}

fn intent_json(status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "pi_123",
        "object": "payment_intent",
        "status": status,
        "amount": 499,
        "currency": "usd",
        "client_secret": "pi_123_secret_abc",
        "metadata": {"email": "a@b.com", "dogName": "Rex", "product": "dog-birthday-video"}
    })
}

#[tokio::test]
async fn test_create_intent_sends_fixed_price_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(header_exists("idempotency-key"))
        .and(body_string_contains("amount=499"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("Dog+Birthday+Video+for+Rex"))
        .and(body_string_contains("metadata%5BdogName%5D=Rex"))
        .and(body_string_contains("metadata%5Bproduct%5D=dog-birthday-video"))
        .and(body_string_contains("automatic_payment_methods%5Benabled%5D=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("requires_payment_method")))
        .expect(1)
        .mount(&server)
        .await;

    let intent = client(&server)
        .create_intent(Some("a@b.com"), Some("Rex"))
        .await
        .unwrap();
    assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
    assert_eq!(intent.amount, 499);
}

#[tokio::test]
async fn test_create_intent_defaults_for_missing_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(body_string_contains("Dog+Birthday+Video+for+your+pup"))
        .and(body_string_contains("metadata%5Bemail%5D=unknown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("requires_payment_method")))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).create_intent(None, Some("  ")).await.unwrap();
}

#[tokio::test]
async fn test_retrieve_intent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("succeeded")))
        .mount(&server)
        .await;

    let intent = client(&server).retrieve_intent("pi_123").await.unwrap();
    assert!(intent.succeeded());
    assert_eq!(intent.metadata_value("dogName"), Some("Rex"));
}

#[tokio::test]
async fn test_retrieve_intent_encodes_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_1%2Fconfirm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("succeeded")))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).retrieve_intent("pi_1/confirm").await.unwrap();
}

#[tokio::test]
async fn test_stripe_error_message_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"type": "invalid_request_error", "message": "No such payment_intent: 'pi_missing'"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).retrieve_intent("pi_missing").await.unwrap_err();
    match err {
        PaymentError::Stripe { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("No such payment_intent"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_123"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server).retrieve_intent("pi_123").await.unwrap_err();
    assert!(matches!(err, PaymentError::Stripe { status: 503, .. }));
}
