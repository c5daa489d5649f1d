use {
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::fmt,
    uuid::Uuid,
};

/// Operational alert codes. Kept as stable strings in storage so the
/// admin surface and dedup window key on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    EventDeadLetter,
    GatewayDispute,
    DeliveryFailed,
    RecipientComplaint,
    RefundProcessingFailed,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventDeadLetter => "EVENT_DEAD_LETTER",
            Self::GatewayDispute => "GATEWAY_DISPUTE",
            Self::DeliveryFailed => "DELIVERY_FAILED",
            Self::RecipientComplaint => "RECIPIENT_COMPLAINT",
            Self::RefundProcessingFailed => "REFUND_PROCESSING_FAILED",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: String,
    pub message: String,
    pub data: serde_json::Value,
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub id: Uuid,
    pub alert_type: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl NewAlert {
    pub fn new(alert_type: AlertType, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            alert_type: alert_type.as_str().to_string(),
            message: message.into(),
            data,
        }
    }
}
