//! Storage contracts. The Postgres implementation lives in `infra`; tests
//! swap in the in-memory store from `test_utils`.

use {
    super::alert::{Alert, NewAlert},
    super::error::PipelineError,
    super::event::{DeliveryChannel, NewInboundEvent, ProcessingStatus, VerificationStatus},
    super::payment::PaymentRecord,
    super::refund::{RefundAction, RefundRequest, RefundStatus},
    super::retry::{NewDeadLetter, NewRetryTicket, RetryTicket},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists the raw notification. The payload column is written once.
    async fn insert_inbound_event(&self, event: &NewInboundEvent) -> Result<(), PipelineError>;

    async fn set_verification_status(
        &self,
        event_id: Uuid,
        status: VerificationStatus,
    ) -> Result<(), PipelineError>;

    async fn set_normalized_type(
        &self,
        event_id: Uuid,
        normalized_type: &str,
    ) -> Result<(), PipelineError>;

    async fn set_processing_status(
        &self,
        event_id: Uuid,
        status: ProcessingStatus,
    ) -> Result<(), PipelineError>;

    /// Claims the (external id, kind) idempotency key. `false` means an
    /// earlier delivery already holds it. Enforced by a uniqueness
    /// constraint, not an in-process lock.
    async fn claim_application(&self, external_id: &str, kind: &str)
    -> Result<bool, PipelineError>;

    /// Releases a claim so a rescheduled attempt can retake it.
    async fn release_application(&self, external_id: &str, kind: &str)
    -> Result<(), PipelineError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>, PipelineError>;

    async fn find_payment_by_gateway_ref(
        &self,
        gateway_ref: &str,
    ) -> Result<Option<PaymentRecord>, PipelineError>;

    /// Booking → confirmed, payment → completed.
    async fn confirm_booking(
        &self,
        booking_ref: &str,
        gateway_ref: &str,
    ) -> Result<(), PipelineError>;

    /// Booking → payment-failed, keeping the gateway's error message.
    async fn fail_booking_payment(
        &self,
        booking_ref: &str,
        reason: &str,
    ) -> Result<(), PipelineError>;

    /// Days between now and the booking's departure, if the booking exists.
    async fn booking_days_until_departure(
        &self,
        booking_ref: &str,
    ) -> Result<Option<i64>, PipelineError>;

    /// Best-effort: a missing delivery-log row is not an error, the log is
    /// owned by the notifications subsystem.
    async fn update_delivery_status(
        &self,
        channel: DeliveryChannel,
        message_ref: &str,
        recipient: &str,
        status: &str,
    ) -> Result<(), PipelineError>;

    /// Insert-only. There is deliberately no call to clear an opt-out.
    async fn set_opt_out(
        &self,
        channel: DeliveryChannel,
        recipient: &str,
    ) -> Result<(), PipelineError>;
}

#[async_trait]
pub trait RetryStore: Send + Sync {
    async fn insert_ticket(&self, ticket: &NewRetryTicket) -> Result<(), PipelineError>;

    async fn due_tickets(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RetryTicket>, PipelineError>;

    async fn delete_ticket(&self, id: Uuid) -> Result<(), PipelineError>;

    async fn reschedule_ticket(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), PipelineError>;

    /// Deletes the ticket (when given) and inserts the dead letter as one
    /// atomic operation, no window where the event is in neither state.
    async fn convert_to_dead_letter(
        &self,
        ticket_id: Option<Uuid>,
        record: &NewDeadLetter,
    ) -> Result<(), PipelineError>;
}

#[async_trait]
pub trait RefundStore: Send + Sync {
    async fn insert_refund(&self, refund: &RefundRequest) -> Result<(), PipelineError>;

    async fn find_refund(&self, id: Uuid) -> Result<Option<RefundRequest>, PipelineError>;

    /// Most recent request for the payment in any status other than
    /// rejected. Gates creation of a second request.
    async fn find_active_refund_for_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<RefundRequest>, PipelineError>;

    /// Compare-and-swap: applies `next` only while the row still holds
    /// `expected`. `false` means the row moved on concurrently.
    async fn transition_refund(
        &self,
        id: Uuid,
        expected: RefundStatus,
        next: RefundStatus,
        gateway_refund_id: Option<&str>,
    ) -> Result<bool, PipelineError>;

    async fn append_refund_action(&self, action: &RefundAction) -> Result<(), PipelineError>;

    async fn refund_actions(&self, refund_id: Uuid) -> Result<Vec<RefundAction>, PipelineError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, alert: &NewAlert) -> Result<(), PipelineError>;

    /// Newest unsent alert of the type created at or after `since`.
    async fn unsent_alert_since(
        &self,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, PipelineError>;

    async fn pending_alerts(&self, limit: i64) -> Result<Vec<Alert>, PipelineError>;

    /// Flips the sent flag. `false` when the alert does not exist.
    async fn mark_alert_sent(&self, id: Uuid) -> Result<bool, PipelineError>;
}

/// The full persistence surface the pipeline is wired against.
pub trait Store:
    EventStore + BookingStore + RetryStore + RefundStore + AlertStore + Send + Sync
{
}

impl<T> Store for T where
    T: EventStore + BookingStore + RetryStore + RefundStore + AlertStore + Send + Sync
{
}
