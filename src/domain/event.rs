use {
    super::error::PipelineError,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// External gateway family a notification originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    CardGateway,
    WalletGateway,
    SmsProvider,
    EmailProvider,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CardGateway => "card_gateway",
            Self::WalletGateway => "wallet_gateway",
            Self::SmsProvider => "sms_provider",
            Self::EmailProvider => "email_provider",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Provider {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "card_gateway" => Ok(Self::CardGateway),
            "wallet_gateway" => Ok(Self::WalletGateway),
            "sms_provider" => Ok(Self::SmsProvider),
            "email_provider" => Ok(Self::EmailProvider),
            other => Err(PipelineError::Validation(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Sms,
    Email,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Internal event taxonomy. One variant per effect the applier knows how
/// to produce; provider-specific field names stop here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed {
        reason: String,
    },
    RefundCompleted {
        gateway_refund_id: String,
    },
    DisputeOpened {
        reason: String,
        amount_cents: i64,
    },
    DeliverySucceeded {
        channel: DeliveryChannel,
        recipient: String,
    },
    DeliveryFailed {
        channel: DeliveryChannel,
        recipient: String,
        permanent: bool,
        reason: String,
    },
    RecipientOptedOut {
        channel: DeliveryChannel,
        recipient: String,
    },
}

impl EventKind {
    /// Stable name, second half of the idempotency key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::RefundCompleted { .. } => "refund_completed",
            Self::DisputeOpened { .. } => "dispute_opened",
            Self::DeliverySucceeded { .. } => "delivery_succeeded",
            Self::DeliveryFailed { .. } => "delivery_failed",
            Self::RecipientOptedOut { .. } => "recipient_opted_out",
        }
    }
}

/// A provider notification mapped onto the internal taxonomy, carrying the
/// stable external identifier used for idempotency keying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub provider: Provider,
    pub external_id: String,
    pub kind: EventKind,
}

impl NormalizedEvent {
    pub fn idempotency_key(&self) -> (&str, &'static str) {
        (&self.external_id, self.kind.as_str())
    }
}

/// Output of a provider adapter: an actionable event, or a recognized-but
/// -harmless one that is logged and acknowledged without touching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Event(NormalizedEvent),
    Informational { event_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Received,
    Processing,
    Succeeded,
    Failed,
    RetryScheduled,
    DeadLettered,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::RetryScheduled => "retry_scheduled",
            Self::DeadLettered => "dead_lettered",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw notification as received. The payload is stored once and never
/// rewritten; retries reference this row.
#[derive(Debug, Clone)]
pub struct NewInboundEvent {
    pub id: Uuid,
    pub provider: Provider,
    pub raw_payload: Vec<u8>,
    pub signature: Option<String>,
}

impl NewInboundEvent {
    pub fn new(provider: Provider, raw_payload: Vec<u8>, signature: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider,
            raw_payload,
            signature,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub id: Uuid,
    pub provider: Provider,
    pub raw_payload: Vec<u8>,
    pub signature: Option<String>,
    pub received_at: DateTime<Utc>,
    pub verification_status: VerificationStatus,
    pub normalized_type: Option<String>,
    pub processing_status: ProcessingStatus,
}

/// Success shapes out of the applier. Failures travel as
/// `PipelineError::{Transient, Permanent}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// State mutated (or deliberately not, for alert-only kinds).
    Applied,
    /// Same (external id, kind) was already applied, no-op success.
    Duplicate,
}
