mod common;

use common::*;
use trip_sync::domain::alert::AlertType;
use trip_sync::services::alerts;
use uuid::Uuid;

#[tokio::test]
async fn duplicate_alert_inside_window_is_suppressed() {
    let h = harness();

    let first = alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute on ch_1",
        serde_json::json!({}),
    )
    .await
    .unwrap();
    let second = alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute on ch_2",
        serde_json::json!({}),
    )
    .await
    .unwrap();

    assert!(first);
    assert!(!second);
    assert_eq!(h.store.all_alerts().len(), 1);
}

#[tokio::test]
async fn different_types_do_not_suppress_each_other() {
    let h = harness();

    alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute",
        serde_json::json!({}),
    )
    .await
    .unwrap();
    let other = alerts::raise(
        &*h.state.store,
        AlertType::DeliveryFailed,
        "sms failed",
        serde_json::json!({}),
    )
    .await
    .unwrap();

    assert!(other);
    assert_eq!(h.store.all_alerts().len(), 2);
}

#[tokio::test]
async fn acknowledged_alert_refires_inside_the_window() {
    let h = harness();

    alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute",
        serde_json::json!({}),
    )
    .await
    .unwrap();
    let id = h.store.all_alerts()[0].id;
    assert!(alerts::acknowledge(&*h.state.store, id).await.unwrap());

    let refired = alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute again",
        serde_json::json!({}),
    )
    .await
    .unwrap();

    assert!(refired);
    let all = h.store.all_alerts();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|a| !a.sent).count(), 1);
}

#[tokio::test]
async fn stale_unsent_alert_no_longer_suppresses() {
    let h = harness();

    alerts::raise(
        &*h.state.store,
        AlertType::EventDeadLetter,
        "dead letter",
        serde_json::json!({}),
    )
    .await
    .unwrap();
    let id = h.store.all_alerts()[0].id;
    h.store.backdate_alert(id, 31);

    let refired = alerts::raise(
        &*h.state.store,
        AlertType::EventDeadLetter,
        "dead letter again",
        serde_json::json!({}),
    )
    .await
    .unwrap();

    assert!(refired);
    assert_eq!(h.store.all_alerts().len(), 2);
}

#[tokio::test]
async fn pending_excludes_acknowledged_alerts() {
    let h = harness();

    alerts::raise(
        &*h.state.store,
        AlertType::GatewayDispute,
        "dispute",
        serde_json::json!({}),
    )
    .await
    .unwrap();
    alerts::raise(
        &*h.state.store,
        AlertType::DeliveryFailed,
        "sms failed",
        serde_json::json!({}),
    )
    .await
    .unwrap();

    let id = h.store.all_alerts()[0].id;
    alerts::acknowledge(&*h.state.store, id).await.unwrap();

    let pending = alerts::pending(&*h.state.store, 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending.iter().all(|a| a.id != id));
}

#[tokio::test]
async fn acknowledging_unknown_alert_reports_false() {
    let h = harness();
    let acked = alerts::acknowledge(&*h.state.store, Uuid::now_v7())
        .await
        .unwrap();
    assert!(!acked);
}
