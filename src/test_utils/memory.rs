//! `MemoryStore` mirrors the Postgres semantics closely enough for
//! pipeline tests: same CAS behavior, same conflict handling, same
//! dedup-window queries.

use {
    crate::domain::{
        alert::{Alert, NewAlert},
        error::PipelineError,
        event::{
            DeliveryChannel, InboundEvent, NewInboundEvent, ProcessingStatus, VerificationStatus,
        },
        money::{Currency, Money, MoneyAmount},
        payment::{PaymentMethod, PaymentRecord},
        refund::{RefundAction, RefundRequest, RefundStatus},
        retry::{DeadLetterRecord, MAX_RETRIES, NewDeadLetter, NewRetryTicket, RetryTicket},
        store::{AlertStore, BookingStore, EventStore, RefundStore, RetryStore},
    },
    async_trait::async_trait,
    chrono::{DateTime, Duration, Utc},
    std::{
        collections::{HashMap, HashSet},
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
    },
    uuid::Uuid,
};

#[derive(Debug, Clone)]
struct BookingRow {
    status: String,
    payment_status: String,
    payment_error: Option<String>,
    days_until_departure: Option<i64>,
}

#[derive(Debug, Clone)]
struct DeliveryRow {
    channel: DeliveryChannel,
    message_ref: String,
    recipient: String,
    status: String,
}

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<HashMap<Uuid, InboundEvent>>,
    applied: Mutex<HashSet<(String, String)>>,
    payments: Mutex<Vec<PaymentRecord>>,
    bookings: Mutex<HashMap<String, BookingRow>>,
    tickets: Mutex<Vec<RetryTicket>>,
    dead: Mutex<Vec<DeadLetterRecord>>,
    refunds: Mutex<HashMap<Uuid, RefundRequest>>,
    actions: Mutex<Vec<RefundAction>>,
    deliveries: Mutex<Vec<DeliveryRow>>,
    opt_outs: Mutex<HashSet<(String, String)>>,
    alerts: Mutex<Vec<Alert>>,
    /// Remaining apply-side writes forced to fail transiently.
    fail_apply_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_apply_failure(&self) -> Result<(), PipelineError> {
        let remaining = self.fail_apply_writes.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_apply_writes.store(remaining - 1, Ordering::Relaxed);
            return Err(PipelineError::Transient("datastore unavailable".into()));
        }
        Ok(())
    }

    // ── Seeding ────────────────────────────────────────────────────────

    pub fn seed_booking(&self, booking_ref: &str, days_until_departure: Option<i64>) {
        self.bookings.lock().unwrap().insert(
            booking_ref.to_string(),
            BookingRow {
                status: "pending_payment".into(),
                payment_status: "pending".into(),
                payment_error: None,
                days_until_departure,
            },
        );
    }

    pub fn seed_payment(
        &self,
        booking_ref: &str,
        gateway_ref: &str,
        method: PaymentMethod,
        amount_cents: i64,
        currency: Currency,
    ) -> Uuid {
        let id = Uuid::now_v7();
        self.payments.lock().unwrap().push(PaymentRecord {
            id,
            booking_ref: booking_ref.to_string(),
            gateway_ref: gateway_ref.to_string(),
            method,
            money: Money::new(MoneyAmount::new(amount_cents).unwrap(), currency),
        });
        id
    }

    pub fn seed_delivery(&self, channel: DeliveryChannel, message_ref: &str, recipient: &str) {
        self.deliveries.lock().unwrap().push(DeliveryRow {
            channel,
            message_ref: message_ref.to_string(),
            recipient: recipient.to_string(),
            status: "sent".into(),
        });
    }

    /// Makes the next `n` apply-side mutations fail like an unavailable
    /// datastore.
    pub fn fail_next_apply_writes(&self, n: u32) {
        self.fail_apply_writes.store(n, Ordering::Relaxed);
    }

    // ── Inspection ─────────────────────────────────────────────────────

    pub fn event(&self, id: Uuid) -> Option<InboundEvent> {
        self.events.lock().unwrap().get(&id).cloned()
    }

    pub fn events(&self) -> Vec<InboundEvent> {
        self.events.lock().unwrap().values().cloned().collect()
    }

    pub fn booking_status(&self, booking_ref: &str) -> Option<(String, String)> {
        self.bookings
            .lock()
            .unwrap()
            .get(booking_ref)
            .map(|b| (b.status.clone(), b.payment_status.clone()))
    }

    pub fn tickets(&self) -> Vec<RetryTicket> {
        self.tickets.lock().unwrap().clone()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterRecord> {
        self.dead.lock().unwrap().clone()
    }

    pub fn all_alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn opted_out(&self, channel: DeliveryChannel, recipient: &str) -> bool {
        self.opt_outs
            .lock()
            .unwrap()
            .contains(&(channel.as_str().to_string(), recipient.to_string()))
    }

    pub fn delivery_status(&self, channel: DeliveryChannel, message_ref: &str) -> Option<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.channel == channel && d.message_ref == message_ref)
            .map(|d| d.status.clone())
    }

    pub fn applied_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn actions_for(&self, refund_id: Uuid) -> Vec<RefundAction> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.refund_id == refund_id)
            .cloned()
            .collect()
    }

    // ── Time control ───────────────────────────────────────────────────

    /// Pulls every ticket's `next_retry_at` into the past so a sweep
    /// picks it up immediately.
    pub fn make_tickets_due(&self) {
        let past = Utc::now() - Duration::seconds(1);
        for ticket in self.tickets.lock().unwrap().iter_mut() {
            ticket.next_retry_at = past;
        }
    }

    /// Moves an alert's creation time back, to step outside the dedup
    /// window without sleeping.
    pub fn backdate_alert(&self, id: Uuid, minutes: i64) {
        for alert in self.alerts.lock().unwrap().iter_mut() {
            if alert.id == id {
                alert.created_at -= Duration::minutes(minutes);
            }
        }
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_inbound_event(&self, event: &NewInboundEvent) -> Result<(), PipelineError> {
        self.events.lock().unwrap().insert(
            event.id,
            InboundEvent {
                id: event.id,
                provider: event.provider,
                raw_payload: event.raw_payload.clone(),
                signature: event.signature.clone(),
                received_at: Utc::now(),
                verification_status: VerificationStatus::Unverified,
                normalized_type: None,
                processing_status: ProcessingStatus::Received,
            },
        );
        Ok(())
    }

    async fn set_verification_status(
        &self,
        event_id: Uuid,
        status: VerificationStatus,
    ) -> Result<(), PipelineError> {
        if let Some(event) = self.events.lock().unwrap().get_mut(&event_id) {
            event.verification_status = status;
        }
        Ok(())
    }

    async fn set_normalized_type(
        &self,
        event_id: Uuid,
        normalized_type: &str,
    ) -> Result<(), PipelineError> {
        if let Some(event) = self.events.lock().unwrap().get_mut(&event_id) {
            event.normalized_type = Some(normalized_type.to_string());
        }
        Ok(())
    }

    async fn set_processing_status(
        &self,
        event_id: Uuid,
        status: ProcessingStatus,
    ) -> Result<(), PipelineError> {
        if let Some(event) = self.events.lock().unwrap().get_mut(&event_id) {
            event.processing_status = status;
        }
        Ok(())
    }

    async fn claim_application(
        &self,
        external_id: &str,
        kind: &str,
    ) -> Result<bool, PipelineError> {
        Ok(self
            .applied
            .lock()
            .unwrap()
            .insert((external_id.to_string(), kind.to_string())))
    }

    async fn release_application(
        &self,
        external_id: &str,
        kind: &str,
    ) -> Result<(), PipelineError> {
        self.applied
            .lock()
            .unwrap()
            .remove(&(external_id.to_string(), kind.to_string()));
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>, PipelineError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_payment_by_gateway_ref(
        &self,
        gateway_ref: &str,
    ) -> Result<Option<PaymentRecord>, PipelineError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.gateway_ref == gateway_ref)
            .cloned())
    }

    async fn confirm_booking(
        &self,
        booking_ref: &str,
        _gateway_ref: &str,
    ) -> Result<(), PipelineError> {
        self.check_apply_failure()?;
        if let Some(booking) = self.bookings.lock().unwrap().get_mut(booking_ref) {
            booking.status = "confirmed".into();
            booking.payment_status = "completed".into();
        }
        Ok(())
    }

    async fn fail_booking_payment(
        &self,
        booking_ref: &str,
        reason: &str,
    ) -> Result<(), PipelineError> {
        self.check_apply_failure()?;
        if let Some(booking) = self.bookings.lock().unwrap().get_mut(booking_ref) {
            booking.status = "payment_failed".into();
            booking.payment_status = "failed".into();
            booking.payment_error = Some(reason.to_string());
        }
        Ok(())
    }

    async fn booking_days_until_departure(
        &self,
        booking_ref: &str,
    ) -> Result<Option<i64>, PipelineError> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .get(booking_ref)
            .and_then(|b| b.days_until_departure))
    }

    async fn update_delivery_status(
        &self,
        channel: DeliveryChannel,
        message_ref: &str,
        recipient: &str,
        status: &str,
    ) -> Result<(), PipelineError> {
        self.check_apply_failure()?;
        for row in self.deliveries.lock().unwrap().iter_mut() {
            if row.channel == channel
                && (row.message_ref == message_ref || row.recipient == recipient)
            {
                row.status = status.to_string();
            }
        }
        Ok(())
    }

    async fn set_opt_out(
        &self,
        channel: DeliveryChannel,
        recipient: &str,
    ) -> Result<(), PipelineError> {
        self.check_apply_failure()?;
        self.opt_outs
            .lock()
            .unwrap()
            .insert((channel.as_str().to_string(), recipient.to_string()));
        Ok(())
    }
}

#[async_trait]
impl RetryStore for MemoryStore {
    async fn insert_ticket(&self, ticket: &NewRetryTicket) -> Result<(), PipelineError> {
        let mut tickets = self.tickets.lock().unwrap();
        if tickets.iter().any(|t| t.event_id == ticket.event_id) {
            return Ok(());
        }
        tickets.push(RetryTicket {
            id: ticket.id,
            event_id: ticket.event_id,
            payload: ticket.payload.clone(),
            attempt_count: 0,
            next_retry_at: ticket.next_retry_at,
            max_retries: MAX_RETRIES,
            last_error: ticket.last_error.clone(),
        });
        Ok(())
    }

    async fn due_tickets(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RetryTicket>, PipelineError> {
        let mut due: Vec<RetryTicket> = self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.next_retry_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|t| t.next_retry_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<(), PipelineError> {
        self.tickets.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn reschedule_ticket(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), PipelineError> {
        for ticket in self.tickets.lock().unwrap().iter_mut() {
            if ticket.id == id {
                ticket.attempt_count = attempt_count;
                ticket.next_retry_at = next_retry_at;
                ticket.last_error = last_error.to_string();
            }
        }
        Ok(())
    }

    async fn convert_to_dead_letter(
        &self,
        ticket_id: Option<Uuid>,
        record: &NewDeadLetter,
    ) -> Result<(), PipelineError> {
        // Single lock scope stands in for the Postgres transaction.
        let mut tickets = self.tickets.lock().unwrap();
        if let Some(ticket_id) = ticket_id {
            tickets.retain(|t| t.id != ticket_id);
        }
        self.dead.lock().unwrap().push(DeadLetterRecord {
            id: record.id,
            event_id: record.event_id,
            reason: record.reason.clone(),
            attempt_count: record.attempt_count,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl RefundStore for MemoryStore {
    async fn insert_refund(&self, refund: &RefundRequest) -> Result<(), PipelineError> {
        self.refunds
            .lock()
            .unwrap()
            .insert(refund.id, refund.clone());
        Ok(())
    }

    async fn find_refund(&self, id: Uuid) -> Result<Option<RefundRequest>, PipelineError> {
        Ok(self.refunds.lock().unwrap().get(&id).cloned())
    }

    async fn find_active_refund_for_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<RefundRequest>, PipelineError> {
        Ok(self
            .refunds
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.payment_id == payment_id && r.status != RefundStatus::Rejected)
            .max_by_key(|r| r.requested_at)
            .cloned())
    }

    async fn transition_refund(
        &self,
        id: Uuid,
        expected: RefundStatus,
        next: RefundStatus,
        gateway_refund_id: Option<&str>,
    ) -> Result<bool, PipelineError> {
        let mut refunds = self.refunds.lock().unwrap();
        match refunds.get_mut(&id) {
            Some(refund) if refund.status == expected => {
                refund.status = next;
                if let Some(gid) = gateway_refund_id {
                    refund.gateway_refund_id = Some(gid.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_refund_action(&self, action: &RefundAction) -> Result<(), PipelineError> {
        self.actions.lock().unwrap().push(action.clone());
        Ok(())
    }

    async fn refund_actions(&self, refund_id: Uuid) -> Result<Vec<RefundAction>, PipelineError> {
        let mut actions: Vec<RefundAction> = self
            .actions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.refund_id == refund_id)
            .cloned()
            .collect();
        actions.sort_by_key(|a| a.created_at);
        Ok(actions)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert(&self, alert: &NewAlert) -> Result<(), PipelineError> {
        self.alerts.lock().unwrap().push(Alert {
            id: alert.id,
            alert_type: alert.alert_type.clone(),
            message: alert.message.clone(),
            data: alert.data.clone(),
            sent: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn unsent_alert_since(
        &self,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, PipelineError> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.alert_type == alert_type && !a.sent && a.created_at >= since)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn pending_alerts(&self, limit: i64) -> Result<Vec<Alert>, PipelineError> {
        let mut pending: Vec<Alert> = self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| !a.sent)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_alert_sent(&self, id: Uuid) -> Result<bool, PipelineError> {
        for alert in self.alerts.lock().unwrap().iter_mut() {
            if alert.id == id {
                alert.sent = true;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
