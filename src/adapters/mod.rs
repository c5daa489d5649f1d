pub mod alert_api;
pub mod api_errors;
pub mod gateway_client;
pub mod notify;
pub mod providers;
pub mod refund_api;
pub mod signature;
pub mod webhooks;

use {
    crate::AppState,
    axum::{
        Router,
        routing::{get, post},
    },
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhooks/card", post(webhooks::card_webhook_handler))
        .route("/webhooks/wallet", post(webhooks::wallet_webhook_handler))
        .route("/webhooks/sms", post(webhooks::sms_webhook_handler))
        .route("/webhooks/email", post(webhooks::email_webhook_handler))
        .route("/staff/refunds", post(refund_api::create_refund_handler))
        .route("/staff/refunds/{id}", get(refund_api::get_refund_handler))
        .route(
            "/staff/refunds/{id}/approve",
            post(refund_api::approve_refund_handler),
        )
        .route(
            "/staff/refunds/{id}/reject",
            post(refund_api::reject_refund_handler),
        )
        .route(
            "/staff/refunds/{id}/process",
            post(refund_api::process_refund_handler),
        )
        .route("/staff/alerts", get(alert_api::list_alerts_handler))
        .route(
            "/staff/alerts/{id}/acknowledge",
            post(alert_api::acknowledge_alert_handler),
        )
        .with_state(state)
}
