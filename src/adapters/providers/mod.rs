//! One adapter per gateway family: the provider's signature scheme plus
//! the mapping from its event vocabulary onto the internal taxonomy.

mod card;
mod email;
mod sms;
mod wallet;

use {
    crate::domain::{
        error::PipelineError,
        event::{Normalized, Provider},
    },
    axum::http::HeaderMap,
};

pub use {card::CardAdapter, email::EmailAdapter, sms::SmsAdapter, wallet::WalletAdapter};

pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Checks the claimed signature against the raw body. Missing headers
    /// fail verification.
    fn verify(&self, headers: &HeaderMap, body: &[u8], secret: &str)
    -> Result<(), PipelineError>;

    /// The signature string as claimed by the caller, for the event record.
    fn claimed_signature(&self, headers: &HeaderMap) -> Option<String>;

    /// Maps a parsed payload onto the internal taxonomy. Unknown event
    /// names come back as `Normalized::Informational`; an actionable event
    /// with an unusable payload is a permanent failure.
    fn normalize(&self, payload: &serde_json::Value) -> Result<Normalized, PipelineError>;
}

pub fn adapter_for(provider: Provider) -> &'static dyn ProviderAdapter {
    match provider {
        Provider::CardGateway => &CardAdapter,
        Provider::WalletGateway => &WalletAdapter,
        Provider::SmsProvider => &SmsAdapter,
        Provider::EmailProvider => &EmailAdapter,
    }
}

/// Pulls a required string field out of a payload object, failing
/// permanently when absent, redelivery of the same payload can never fix it.
fn required_str<'a>(
    value: &'a serde_json::Value,
    field: &str,
    context: &str,
) -> Result<&'a str, PipelineError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PipelineError::Permanent(format!("{context} is missing {field}")))
}
