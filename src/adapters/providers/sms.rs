use {
    super::{ProviderAdapter, required_str},
    crate::adapters::signature::{required_header, verify_hex},
    crate::domain::{
        error::PipelineError,
        event::{DeliveryChannel, EventKind, Normalized, NormalizedEvent, Provider},
    },
    axum::http::HeaderMap,
};

const TIMESTAMP_HEADER: &str = "X-Sms-Timestamp";
const TOKEN_HEADER: &str = "X-Sms-Token";
const SIGNATURE_HEADER: &str = "X-Sms-Signature";

/// SMS delivery-status callbacks. The provider signs a one-time token
/// concatenated after the timestamp; the body itself is not covered.
pub struct SmsAdapter;

impl ProviderAdapter for SmsAdapter {
    fn provider(&self) -> Provider {
        Provider::SmsProvider
    }

    fn verify(
        &self,
        headers: &HeaderMap,
        _body: &[u8],
        secret: &str,
    ) -> Result<(), PipelineError> {
        let timestamp = required_header(headers, TIMESTAMP_HEADER)?;
        let token = required_header(headers, TOKEN_HEADER)?;
        let sig = required_header(headers, SIGNATURE_HEADER)?;

        let signed = format!("{timestamp}{token}");
        verify_hex(secret, signed.as_bytes(), sig)
    }

    fn claimed_signature(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn normalize(&self, payload: &serde_json::Value) -> Result<Normalized, PipelineError> {
        let status = payload
            .get("MessageStatus")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let kind = match status {
            "delivered" => EventKind::DeliverySucceeded {
                channel: DeliveryChannel::Sms,
                recipient: required_str(payload, "To", "sms callback")?.to_string(),
            },
            "failed" | "undelivered" => EventKind::DeliveryFailed {
                channel: DeliveryChannel::Sms,
                recipient: required_str(payload, "To", "sms callback")?.to_string(),
                permanent: false,
                reason: payload
                    .get("ErrorMessage")
                    .and_then(|v| v.as_str())
                    .unwrap_or(status)
                    .to_string(),
            },
            // queued / sending / sent are progress notices, nothing to apply
            other => {
                return Ok(Normalized::Informational {
                    event_name: if other.is_empty() { "unknown" } else { other }.to_string(),
                });
            }
        };

        Ok(Normalized::Event(NormalizedEvent {
            provider: Provider::SmsProvider,
            external_id: required_str(payload, "MessageSid", "sms callback")?.to_string(),
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

    fn signed_headers(secret: &str, timestamp: &str, token: &str) -> HeaderMap {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}{token}").as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, timestamp.parse().unwrap());
        headers.insert(TOKEN_HEADER, token.parse().unwrap());
        headers.insert(SIGNATURE_HEADER, digest.parse().unwrap());
        headers
    }

    #[test]
    fn token_timestamp_signature_verifies() {
        let headers = signed_headers("whsec_sms", "1700000000", "tok-abc");
        assert!(SmsAdapter.verify(&headers, b"{}", "whsec_sms").is_ok());
    }

    #[test]
    fn replayed_token_with_other_timestamp_fails() {
        let mut headers = signed_headers("whsec_sms", "1700000000", "tok-abc");
        headers.insert(TIMESTAMP_HEADER, "1700009999".parse().unwrap());
        assert!(SmsAdapter.verify(&headers, b"{}", "whsec_sms").is_err());
    }

    #[test]
    fn delivered_maps_to_delivery_succeeded() {
        let payload = json!({"MessageStatus": "delivered", "MessageSid": "SM1", "To": "+15550100"});
        match SmsAdapter.normalize(&payload).unwrap() {
            Normalized::Event(ev) => {
                assert_eq!(ev.external_id, "SM1");
                assert_eq!(
                    ev.kind,
                    EventKind::DeliverySucceeded {
                        channel: DeliveryChannel::Sms,
                        recipient: "+15550100".into()
                    }
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn progress_statuses_are_informational() {
        for status in ["queued", "sending", "sent"] {
            let payload = json!({"MessageStatus": status, "MessageSid": "SM1", "To": "+1"});
            assert!(matches!(
                SmsAdapter.normalize(&payload).unwrap(),
                Normalized::Informational { .. }
            ));
        }
    }
}
