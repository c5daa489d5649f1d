use {
    super::{ProviderAdapter, required_str},
    crate::adapters::signature::{required_header, verify_base64},
    crate::domain::{
        error::PipelineError,
        event::{DeliveryChannel, EventKind, Normalized, NormalizedEvent, Provider},
    },
    axum::http::HeaderMap,
};

const TIMESTAMP_HEADER: &str = "X-Email-Webhook-Timestamp";
const SIGNATURE_HEADER: &str = "X-Email-Webhook-Signature";

/// Email delivery/bounce/complaint callbacks. Signature header is
/// `v1=<base64 digest>` over `<timestamp><body>`.
pub struct EmailAdapter;

impl ProviderAdapter for EmailAdapter {
    fn provider(&self) -> Provider {
        Provider::EmailProvider
    }

    fn verify(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        secret: &str,
    ) -> Result<(), PipelineError> {
        let timestamp = required_header(headers, TIMESTAMP_HEADER)?;
        let header = required_header(headers, SIGNATURE_HEADER)?;
        let digest = header.strip_prefix("v1=").ok_or_else(|| {
            PipelineError::Verification(format!("malformed {SIGNATURE_HEADER} header"))
        })?;

        let mut signed = Vec::with_capacity(timestamp.len() + body.len());
        signed.extend_from_slice(timestamp.as_bytes());
        signed.extend_from_slice(body);
        verify_base64(secret, &signed, digest)
    }

    fn claimed_signature(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn normalize(&self, payload: &serde_json::Value) -> Result<Normalized, PipelineError> {
        let event_name = payload.get("event").and_then(|v| v.as_str()).unwrap_or("");
        let recipient = || required_str(payload, "email", "email callback").map(str::to_string);
        let message_id = payload
            .get("messageId")
            .or_else(|| payload.get("id"))
            .and_then(|v| v.as_str());

        let kind = match event_name {
            "delivered" | "delivery" => EventKind::DeliverySucceeded {
                channel: DeliveryChannel::Email,
                recipient: recipient()?,
            },
            "bounce" | "bounced" => {
                let bounce_type = payload
                    .get("bounceType")
                    .and_then(|v| v.as_str())
                    .unwrap_or("permanent");
                EventKind::DeliveryFailed {
                    channel: DeliveryChannel::Email,
                    recipient: recipient()?,
                    permanent: bounce_type.eq_ignore_ascii_case("permanent"),
                    reason: payload
                        .get("reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or(bounce_type)
                        .to_string(),
                }
            }
            "complaint" | "spamreport" | "marked_as_spam" => EventKind::RecipientOptedOut {
                channel: DeliveryChannel::Email,
                recipient: recipient()?,
            },
            // opens, clicks and drops are engagement noise here
            other => {
                return Ok(Normalized::Informational {
                    event_name: if other.is_empty() { "unknown" } else { other }.to_string(),
                });
            }
        };

        // Complaints sometimes arrive without the original message id; the
        // recipient address still gives a stable idempotency key.
        let external_id = match message_id {
            Some(id) => id.to_string(),
            None => required_str(payload, "email", "email callback")?.to_string(),
        };

        Ok(Normalized::Event(NormalizedEvent {
            provider: Provider::EmailProvider,
            external_id,
            kind,
        }))
    }
}
