use std::time::Duration;
use trip_sync::adapters::gateway_client::HttpRefundGateway;
use trip_sync::domain::error::PipelineError;
use trip_sync::domain::gateway::RefundGateway;
use trip_sync::domain::money::{Currency, Money, MoneyAmount};
use trip_sync::domain::payment::PaymentMethod;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(card_url: &str, timeout: Duration) -> HttpRefundGateway {
    HttpRefundGateway::new(
        card_url.to_string(),
        "http://wallet.invalid".to_string(),
        "sk_card_test".to_string(),
        "sk_wallet_test".to_string(),
        timeout,
    )
    .unwrap()
}

fn ten_dollars() -> Money {
    Money::new(MoneyAmount::new(1_000).unwrap(), Currency::Usd)
}

#[tokio::test]
async fn submits_refund_and_returns_gateway_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refunds"))
        .and(body_partial_json(serde_json::json!({
            "gateway_ref": "pi_123",
            "amount_cents": 1_000,
            "currency": "usd"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "re_789"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server.uri(), Duration::from_secs(2));
    let refund = gateway
        .submit_refund(
            PaymentMethod::Card,
            "pi_123",
            &ten_dollars(),
            Uuid::now_v7(),
        )
        .await
        .unwrap();

    assert_eq!(refund.refund_txn_id, "re_789");
}

#[tokio::test]
async fn non_success_status_surfaces_as_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refunds"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = gateway(&server.uri(), Duration::from_secs(2));
    let err = gateway
        .submit_refund(PaymentMethod::Card, "pi_500", &ten_dollars(), Uuid::now_v7())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Gateway(_)));
}

#[tokio::test]
async fn slow_gateway_times_out_as_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refunds"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "re_late"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let gateway = gateway(&server.uri(), Duration::from_millis(50));
    let err = gateway
        .submit_refund(PaymentMethod::Card, "pi_slow", &ten_dollars(), Uuid::now_v7())
        .await
        .unwrap_err();

    match err {
        PipelineError::Gateway(msg) => assert!(msg.contains("timed out"), "got: {msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_gateway_response_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refunds"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let gateway = gateway(&server.uri(), Duration::from_secs(2));
    let err = gateway
        .submit_refund(PaymentMethod::Card, "pi_bad", &ten_dollars(), Uuid::now_v7())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Gateway(_)));
}
