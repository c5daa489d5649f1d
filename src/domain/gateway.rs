use {
    super::error::PipelineError,
    super::money::Money,
    super::payment::PaymentMethod,
    super::refund::RefundRequest,
    async_trait::async_trait,
    uuid::Uuid,
};

/// Result of an outbound refund submission.
#[derive(Debug, Clone)]
pub struct GatewayRefund {
    pub refund_txn_id: String,
}

/// Outbound call to the payment gateway that took the original charge.
/// Implementations must bound the call with a timeout; a timed-out call
/// surfaces as `PipelineError::Gateway`.
#[async_trait]
pub trait RefundGateway: Send + Sync {
    async fn submit_refund(
        &self,
        method: PaymentMethod,
        gateway_ref: &str,
        amount: &Money,
        reference: Uuid,
    ) -> Result<GatewayRefund, PipelineError>;
}

/// Downstream notification dispatch. Fire-and-forget from the pipeline's
/// perspective: callers log a failed Result and move on, but the error is
/// part of the contract rather than swallowed inside.
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn booking_confirmed(&self, booking_ref: &str) -> Result<(), PipelineError>;

    async fn booking_payment_failed(
        &self,
        booking_ref: &str,
        reason: &str,
    ) -> Result<(), PipelineError>;

    /// `stage` is the refund action just taken (approved, rejected, …).
    async fn refund_update(&self, refund: &RefundRequest, stage: &str)
    -> Result<(), PipelineError>;
}
