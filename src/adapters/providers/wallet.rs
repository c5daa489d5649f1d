use {
    super::{ProviderAdapter, required_str},
    crate::adapters::signature::{required_header, verify_base64},
    crate::domain::{
        error::PipelineError,
        event::{EventKind, Normalized, NormalizedEvent, Provider},
    },
    axum::http::HeaderMap,
};

const TRANSMISSION_ID: &str = "Wallet-Transmission-Id";
const TRANSMISSION_TIME: &str = "Wallet-Transmission-Time";
const TRANSMISSION_SIG: &str = "Wallet-Transmission-Sig";

/// Wallet processor notifications. Signed content is
/// `<transmission-id>|<transmission-time>|<body>`, digest is base64.
pub struct WalletAdapter;

impl ProviderAdapter for WalletAdapter {
    fn provider(&self) -> Provider {
        Provider::WalletGateway
    }

    fn verify(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        secret: &str,
    ) -> Result<(), PipelineError> {
        let id = required_header(headers, TRANSMISSION_ID)?;
        let time = required_header(headers, TRANSMISSION_TIME)?;
        let sig = required_header(headers, TRANSMISSION_SIG)?;

        let mut signed = Vec::with_capacity(id.len() + time.len() + body.len() + 2);
        signed.extend_from_slice(id.as_bytes());
        signed.push(b'|');
        signed.extend_from_slice(time.as_bytes());
        signed.push(b'|');
        signed.extend_from_slice(body);
        verify_base64(secret, &signed, sig)
    }

    fn claimed_signature(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(TRANSMISSION_SIG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn normalize(&self, payload: &serde_json::Value) -> Result<Normalized, PipelineError> {
        let event_name = payload
            .get("event_type")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let resource = payload
            .get("resource")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let (external_id, kind) = match event_name {
            "PAYMENT.SALE.COMPLETED" => (
                required_str(&resource, "id", "wallet sale")?.to_string(),
                EventKind::PaymentSucceeded,
            ),
            "PAYMENT.SALE.DENIED" => (
                required_str(&resource, "id", "wallet sale")?.to_string(),
                EventKind::PaymentFailed {
                    reason: resource
                        .get("reason_code")
                        .and_then(|v| v.as_str())
                        .unwrap_or("denied")
                        .to_string(),
                },
            ),
            "PAYMENT.SALE.REFUNDED" => {
                let refund_id = required_str(&resource, "id", "wallet refund")?.to_string();
                let sale_id = resource
                    .get("sale_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&refund_id)
                    .to_string();
                (
                    sale_id,
                    EventKind::RefundCompleted {
                        gateway_refund_id: refund_id,
                    },
                )
            }
            "CUSTOMER.DISPUTE.CREATED" => (
                required_str(&resource, "disputed_transaction_id", "wallet dispute")?.to_string(),
                EventKind::DisputeOpened {
                    reason: resource
                        .get("reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unspecified")
                        .to_string(),
                    amount_cents: resource
                        .get("dispute_amount_cents")
                        .and_then(|v| v.as_i64())
                        .unwrap_or(0),
                },
            ),
            other => {
                return Ok(Normalized::Informational {
                    event_name: if other.is_empty() { "unknown" } else { other }.to_string(),
                });
            }
        };

        Ok(Normalized::Event(NormalizedEvent {
            provider: Provider::WalletGateway,
            external_id,
            kind,
        }))
    }
}
