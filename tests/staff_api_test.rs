mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use http_body_util::BodyExt;
use tower::ServiceExt;
use trip_sync::adapters::routes;
use trip_sync::domain::alert::AlertType;
use trip_sync::domain::money::Currency;
use trip_sync::domain::payment::PaymentMethod;
use trip_sync::services::alerts;
use uuid::Uuid;

fn json_post(path: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn refund_lifecycle_over_http() {
    let h = harness();
    h.store.seed_booking("BK-API", Some(45));
    let payment_id = h.store.seed_payment(
        "BK-API",
        "pi_api",
        PaymentMethod::Card,
        10_000,
        Currency::Usd,
    );
    let router = routes(h.state.clone());

    // Create
    let response = router
        .clone()
        .oneshot(json_post(
            "/staff/refunds",
            serde_json::json!({
                "payment_id": payment_id,
                "amount_cents": 10_000,
                "reason": "trip cancelled",
                "requester": "staff:ana"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["refund"]["processing_fee"], 300);
    assert_eq!(created["refund"]["net_refund"], 9_700);
    assert_eq!(created["advisory_percentage"], 100);
    let refund_id: Uuid =
        serde_json::from_value(created["refund"]["id"].clone()).unwrap();

    // Approve
    let response = router
        .clone()
        .oneshot(json_post(
            &format!("/staff/refunds/{refund_id}/approve"),
            serde_json::json!({"actor": "staff:omar"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "approved");

    // Process
    let response = router
        .clone()
        .oneshot(json_post(
            &format!("/staff/refunds/{refund_id}/process"),
            serde_json::json!({"actor": "staff:omar"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "processed");

    // Detail view carries the full action trail.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/staff/refunds/{refund_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    let actions: Vec<String> = detail["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["requested", "approved", "processed"]);
}

#[tokio::test]
async fn staff_errors_carry_the_specific_reason() {
    let h = harness();
    let router = routes(h.state.clone());

    // Unknown payment
    let response = router
        .clone()
        .oneshot(json_post(
            "/staff/refunds",
            serde_json::json!({
                "payment_id": Uuid::now_v7(),
                "amount_cents": 1_000,
                "reason": "x",
                "requester": "staff:ana"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "validation_error");
    assert_eq!(body["message"], "payment not found");

    // Negative amount
    let response = router
        .clone()
        .oneshot(json_post(
            "/staff/refunds",
            serde_json::json!({
                "payment_id": Uuid::now_v7(),
                "amount_cents": -5,
                "reason": "x",
                "requester": "staff:ana"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn alert_surface_lists_and_acknowledges() {
    let h = harness();
    alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute on ch_1",
        serde_json::json!({"charge": "ch_1"}),
    )
    .await
    .unwrap();
    let router = routes(h.state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/staff/alerts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let alert_id: Uuid = serde_json::from_value(listed[0]["id"].clone()).unwrap();

    let response = router
        .clone()
        .oneshot(json_post(
            &format!("/staff/alerts/{alert_id}/acknowledge"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Gone from the pending list, 404 on a second acknowledge target.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/staff/alerts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert!(listed.as_array().unwrap().is_empty());

    let response = router
        .oneshot(json_post(
            &format!("/staff/alerts/{}/acknowledge", Uuid::now_v7()),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
