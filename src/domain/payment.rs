use {
    super::error::PipelineError,
    super::money::Money,
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Rail the original payment was taken on. Refunds must go back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "card" => Ok(Self::Card),
            "wallet" => Ok(Self::Wallet),
            other => Err(PipelineError::Validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Payment row as seen by the pipeline. Owned by the booking subsystem;
/// this core only reads it and flips booking/payment status through the
/// narrow store calls.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_ref: String,
    /// Transaction id assigned by the gateway (payment intent, sale id).
    pub gateway_ref: String,
    pub method: PaymentMethod,
    pub money: Money,
}
