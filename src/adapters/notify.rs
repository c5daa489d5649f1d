//! Notification dispatch stub. Template composition and transport belong
//! to the communications subsystem; this adapter only hands work over and
//! records that it did.

use {
    crate::domain::{
        error::PipelineError, gateway::NotificationDispatch, refund::RefundRequest,
    },
    async_trait::async_trait,
};

pub struct LogNotifier;

#[async_trait]
impl NotificationDispatch for LogNotifier {
    async fn booking_confirmed(&self, booking_ref: &str) -> Result<(), PipelineError> {
        tracing::info!(booking_ref, "confirmation notification dispatched");
        Ok(())
    }

    async fn booking_payment_failed(
        &self,
        booking_ref: &str,
        reason: &str,
    ) -> Result<(), PipelineError> {
        tracing::info!(booking_ref, reason, "payment-failure notification dispatched");
        Ok(())
    }

    async fn refund_update(
        &self,
        refund: &RefundRequest,
        stage: &str,
    ) -> Result<(), PipelineError> {
        tracing::info!(refund_id = %refund.id, stage, "refund notification dispatched");
        Ok(())
    }
}
