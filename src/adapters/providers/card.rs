use {
    super::{ProviderAdapter, required_str},
    crate::adapters::signature::{required_header, verify_hex},
    crate::domain::{
        error::PipelineError,
        event::{EventKind, Normalized, NormalizedEvent, Provider},
    },
    axum::http::HeaderMap,
};

const SIGNATURE_HEADER: &str = "Card-Signature";

/// Card processor notifications. Signature header carries a timestamp and
/// a hex digest: `t=<unix>,v1=<hex>`, signed content is `<t>.<body>`.
pub struct CardAdapter;

fn parse_signature_header(value: &str) -> Result<(&str, &str), PipelineError> {
    let mut timestamp = None;
    let mut digest = None;
    for part in value.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            digest = Some(v);
        }
    }
    match (timestamp, digest) {
        (Some(t), Some(v)) => Ok((t, v)),
        _ => Err(PipelineError::Verification(format!(
            "malformed {SIGNATURE_HEADER} header"
        ))),
    }
}

impl ProviderAdapter for CardAdapter {
    fn provider(&self) -> Provider {
        Provider::CardGateway
    }

    fn verify(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        secret: &str,
    ) -> Result<(), PipelineError> {
        let header = required_header(headers, SIGNATURE_HEADER)?;
        let (timestamp, digest) = parse_signature_header(header)?;

        let mut signed = Vec::with_capacity(timestamp.len() + 1 + body.len());
        signed.extend_from_slice(timestamp.as_bytes());
        signed.push(b'.');
        signed.extend_from_slice(body);
        verify_hex(secret, &signed, digest)
    }

    fn claimed_signature(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn normalize(&self, payload: &serde_json::Value) -> Result<Normalized, PipelineError> {
        let event_name = payload.get("type").and_then(|v| v.as_str()).unwrap_or("");
        let object = payload
            .get("data")
            .and_then(|d| d.get("object"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let kind = match event_name {
            "payment_intent.succeeded" => EventKind::PaymentSucceeded,
            "payment_intent.payment_failed" => EventKind::PaymentFailed {
                reason: object
                    .get("last_payment_error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            },
            "charge.refunded" => {
                // Keyed by the originating payment intent; the refund's own
                // id is what gets stamped on the refund request.
                let payment_ref = object
                    .get("payment_intent")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        PipelineError::Permanent("charge.refunded is missing payment_intent".into())
                    })?;
                let refund_id = object
                    .get("refunds")
                    .and_then(|r| r.get("data"))
                    .and_then(|d| d.get(0))
                    .and_then(|f| f.get("id"))
                    .and_then(|v| v.as_str())
                    .or_else(|| object.get("id").and_then(|v| v.as_str()))
                    .unwrap_or(payment_ref.as_str())
                    .to_string();
                return Ok(Normalized::Event(NormalizedEvent {
                    provider: Provider::CardGateway,
                    external_id: payment_ref,
                    kind: EventKind::RefundCompleted {
                        gateway_refund_id: refund_id,
                    },
                }));
            }
            "charge.dispute.created" => EventKind::DisputeOpened {
                reason: object
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unspecified")
                    .to_string(),
                amount_cents: object.get("amount").and_then(|v| v.as_i64()).unwrap_or(0),
            },
            other => {
                return Ok(Normalized::Informational {
                    event_name: if other.is_empty() { "unknown" } else { other }.to_string(),
                });
            }
        };

        let external_id = match &kind {
            // Disputes reference the disputed charge, not their own object id.
            EventKind::DisputeOpened { .. } => object
                .get("charge")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    PipelineError::Permanent("dispute event is missing charge reference".into())
                })?,
            _ => required_str(&object, "id", "card event object")?.to_string(),
        };

        Ok(Normalized::Event(NormalizedEvent {
            provider: Provider::CardGateway,
            external_id,
            kind,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use serde_json::json;
    use sha2::Sha256;

    fn signed_headers(secret: &str, timestamp: &str, body: &str) -> HeaderMap {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{body}").as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            format!("t={timestamp},v1={digest}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn valid_signature_passes() {
        let body = r#"{"type":"payment_intent.succeeded"}"#;
        let headers = signed_headers("whsec_card", "1700000000", body);
        assert!(
            CardAdapter
                .verify(&headers, body.as_bytes(), "whsec_card")
                .is_ok()
        );
    }

    #[test]
    fn missing_header_fails_closed() {
        let err = CardAdapter
            .verify(&HeaderMap::new(), b"{}", "whsec_card")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Verification(_)));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let headers = signed_headers("whsec_card", "1700000000", "{}");
        assert!(
            CardAdapter
                .verify(&headers, b"{\"x\":1}", "whsec_card")
                .is_err()
        );
    }

    #[test]
    fn payment_succeeded_maps_with_intent_id() {
        let payload = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_123", "amount": 48_000}}
        });
        match CardAdapter.normalize(&payload).unwrap() {
            Normalized::Event(ev) => {
                assert_eq!(ev.external_id, "pi_123");
                assert_eq!(ev.kind, EventKind::PaymentSucceeded);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn refund_event_keys_on_payment_intent() {
        let payload = json!({
            "type": "charge.refunded",
            "data": {"object": {
                "id": "ch_9",
                "payment_intent": "pi_123",
                "refunds": {"data": [{"id": "re_77"}]}
            }}
        });
        match CardAdapter.normalize(&payload).unwrap() {
            Normalized::Event(ev) => {
                assert_eq!(ev.external_id, "pi_123");
                assert_eq!(
                    ev.kind,
                    EventKind::RefundCompleted {
                        gateway_refund_id: "re_77".into()
                    }
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_informational() {
        let payload = json!({"type": "customer.subscription.updated", "data": {"object": {}}});
        assert_eq!(
            CardAdapter.normalize(&payload).unwrap(),
            Normalized::Informational {
                event_name: "customer.subscription.updated".into()
            }
        );
    }

    #[test]
    fn actionable_event_without_object_id_is_permanent() {
        let payload = json!({"type": "payment_intent.succeeded", "data": {"object": {}}});
        assert!(matches!(
            CardAdapter.normalize(&payload),
            Err(PipelineError::Permanent(_))
        ));
    }
}
