use {
    super::error::PipelineError,
    super::money::{Money, MoneyAmount},
    super::payment::{PaymentMethod, PaymentRecord},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Share of the requested amount withheld as a processing fee.
pub const PROCESSING_FEE_PERCENT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Legal transitions. `Processed` is only reachable from `Approved`;
    /// `Rejected`, `Processed` and `Failed` absorb everything.
    pub fn can_transition_to(&self, next: &RefundStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Processed)
                | (Self::Approved, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Processed | Self::Failed)
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RefundStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(PipelineError::Validation(format!(
                "unknown refund status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub booking_ref: String,
    pub requester: String,
    pub money: Money,
    pub reason: String,
    pub notes: Option<String>,
    pub processing_fee: MoneyAmount,
    pub net_refund: MoneyAmount,
    pub method: PaymentMethod,
    pub status: RefundStatus,
    /// Transaction id the gateway assigned to the refund, set on processing.
    pub gateway_refund_id: Option<String>,
    /// Requested amount exceeded the advisory policy ceiling.
    pub flagged_for_review: bool,
    pub requested_at: DateTime<Utc>,
}

impl RefundRequest {
    /// Builds a pending request against `payment`, computing fee and net.
    /// Amount must be positive and no larger than the original payment;
    /// the refund rail is inherited from the payment.
    pub fn create(
        payment: &PaymentRecord,
        amount: MoneyAmount,
        reason: String,
        notes: Option<String>,
        requester: String,
        flagged_for_review: bool,
    ) -> Result<Self, PipelineError> {
        if amount.is_zero() {
            return Err(PipelineError::Validation(
                "refund amount must be greater than 0".into(),
            ));
        }
        if amount > payment.money.amount() {
            return Err(PipelineError::Validation(
                "refund amount cannot exceed payment amount".into(),
            ));
        }

        let processing_fee = amount.percentage(PROCESSING_FEE_PERCENT);
        let net_refund = amount
            .checked_sub(processing_fee)
            .ok_or_else(|| PipelineError::Validation("processing fee exceeds amount".into()))?;

        Ok(Self {
            id: Uuid::now_v7(),
            payment_id: payment.id,
            booking_ref: payment.booking_ref.clone(),
            requester,
            money: Money::new(amount, *payment.money.currency()),
            reason,
            notes,
            processing_fee,
            net_refund,
            method: payment.method,
            status: RefundStatus::Pending,
            gateway_refund_id: None,
            flagged_for_review,
            requested_at: Utc::now(),
        })
    }
}

/// One row of the append-only action log. Never pruned.
#[derive(Debug, Clone, Serialize)]
pub struct RefundAction {
    pub id: Uuid,
    pub refund_id: Uuid,
    pub action: String,
    pub actor: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RefundAction {
    pub fn new(refund_id: Uuid, action: &str, actor: &str, notes: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            refund_id,
            action: action.to_string(),
            actor: actor.to_string(),
            notes,
            created_at: Utc::now(),
        }
    }
}
