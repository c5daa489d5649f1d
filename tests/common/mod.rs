#![allow(dead_code)]

use axum::http::HeaderMap;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use trip_sync::test_utils::{MemoryStore, MockRefundGateway, RecordingNotifier};
use trip_sync::{AppState, ProviderSecrets};

pub const CARD_SECRET: &str = "whsec_card_test";
pub const WALLET_SECRET: &str = "whsec_wallet_test";
pub const SMS_SECRET: &str = "whsec_sms_test";
pub const EMAIL_SECRET: &str = "whsec_email_test";

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockRefundGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

/// In-memory wiring for pipeline tests: same state shape main() builds,
/// with every collaborator swappable and inspectable.
pub fn harness() -> Harness {
    harness_with_gateway(MockRefundGateway::new())
}

pub fn harness_with_gateway(gateway: MockRefundGateway) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(RecordingNotifier::new());
    let state = AppState {
        store: store.clone(),
        gateway: gateway.clone(),
        notifier: notifier.clone(),
        secrets: Arc::new(ProviderSecrets {
            card: CARD_SECRET.into(),
            wallet: WALLET_SECRET.into(),
            sms: SMS_SECRET.into(),
            email: EMAIL_SECRET.into(),
        }),
    };
    Harness {
        state,
        store,
        gateway,
        notifier,
    }
}

fn hmac_bytes(secret: &str, content: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(content);
    mac.finalize().into_bytes().to_vec()
}

// ── Signed header builders, one per provider scheme ────────────────────

pub fn card_headers(body: &str) -> HeaderMap {
    let timestamp = "1700000000";
    let digest = hex::encode(hmac_bytes(CARD_SECRET, format!("{timestamp}.{body}").as_bytes()));
    let mut headers = HeaderMap::new();
    headers.insert(
        "Card-Signature",
        format!("t={timestamp},v1={digest}").parse().unwrap(),
    );
    headers
}

pub fn wallet_headers(body: &str) -> HeaderMap {
    let id = "tx-0001";
    let time = "2026-01-01T00:00:00Z";
    let digest = base64::engine::general_purpose::STANDARD
        .encode(hmac_bytes(WALLET_SECRET, format!("{id}|{time}|{body}").as_bytes()));
    let mut headers = HeaderMap::new();
    headers.insert("Wallet-Transmission-Id", id.parse().unwrap());
    headers.insert("Wallet-Transmission-Time", time.parse().unwrap());
    headers.insert("Wallet-Transmission-Sig", digest.parse().unwrap());
    headers
}

pub fn sms_headers() -> HeaderMap {
    let timestamp = "1700000000";
    let token = "tok-0001";
    let digest = hex::encode(hmac_bytes(SMS_SECRET, format!("{timestamp}{token}").as_bytes()));
    let mut headers = HeaderMap::new();
    headers.insert("X-Sms-Timestamp", timestamp.parse().unwrap());
    headers.insert("X-Sms-Token", token.parse().unwrap());
    headers.insert("X-Sms-Signature", digest.parse().unwrap());
    headers
}

pub fn email_headers(body: &str) -> HeaderMap {
    let timestamp = "1700000000";
    let digest = base64::engine::general_purpose::STANDARD
        .encode(hmac_bytes(EMAIL_SECRET, format!("{timestamp}{body}").as_bytes()));
    let mut headers = HeaderMap::new();
    headers.insert("X-Email-Webhook-Timestamp", timestamp.parse().unwrap());
    headers.insert(
        "X-Email-Webhook-Signature",
        format!("v1={digest}").parse().unwrap(),
    );
    headers
}

// ── Provider payload builders ──────────────────────────────────────────

pub fn card_payment_succeeded(pi: &str) -> String {
    serde_json::json!({
        "id": format!("evt_{pi}"),
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": pi, "amount": 48_000, "currency": "usd"}}
    })
    .to_string()
}

pub fn card_payment_failed(pi: &str, message: &str) -> String {
    serde_json::json!({
        "id": format!("evt_{pi}_fail"),
        "type": "payment_intent.payment_failed",
        "data": {"object": {"id": pi, "last_payment_error": {"message": message}}}
    })
    .to_string()
}

pub fn card_refund_completed(pi: &str, refund_id: &str) -> String {
    serde_json::json!({
        "type": "charge.refunded",
        "data": {"object": {
            "id": format!("ch_{pi}"),
            "payment_intent": pi,
            "refunds": {"data": [{"id": refund_id}]}
        }}
    })
    .to_string()
}

pub fn email_complaint(recipient: &str, message_id: &str) -> String {
    serde_json::json!({
        "event": "complaint",
        "email": recipient,
        "messageId": message_id
    })
    .to_string()
}
