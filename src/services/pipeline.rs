//! Ingestion path for inbound gateway notifications: verify, record,
//! normalize, apply, all within the request, retries out-of-band.

use crate::{
    AppState,
    adapters::providers::adapter_for,
    domain::{
        alert::AlertType,
        error::PipelineError,
        event::{ApplyOutcome, NewInboundEvent, Normalized, ProcessingStatus, Provider,
                VerificationStatus},
        retry::NewDeadLetter,
        store::{EventStore, RetryStore},
    },
    services::{alerts, applier, retry},
};

/// What the webhook handler reports back to the gateway. Callers only see
/// a generic accepted/rejected signal derived from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Applied,
    Duplicate,
    Informational,
    /// First attempt failed transiently; a retry ticket now owns the event.
    /// Reported as a server error so the gateway may also redeliver —
    /// idempotency absorbs whichever attempt lands first.
    RetryScheduled,
    /// The event can never apply and was parked terminally.
    DeadLettered,
}

#[tracing::instrument(name = "ingest", skip_all, fields(provider = %provider))]
pub async fn ingest(
    state: &AppState,
    provider: Provider,
    headers: &axum::http::HeaderMap,
    body: &[u8],
) -> Result<IngestOutcome, PipelineError> {
    let adapter = adapter_for(provider);

    // The raw delivery is recorded whatever happens next, but nothing
    // beyond this row is touched until the signature checks out.
    let record = NewInboundEvent::new(
        provider,
        body.to_vec(),
        adapter.claimed_signature(headers),
    );
    let event_id = record.id;
    state.store.insert_inbound_event(&record).await?;

    if let Err(e) = adapter.verify(headers, body, state.secrets.for_provider(provider)) {
        state
            .store
            .set_verification_status(event_id, VerificationStatus::Rejected)
            .await?;
        state
            .store
            .set_processing_status(event_id, ProcessingStatus::Failed)
            .await?;
        tracing::warn!(event_id = %event_id, error = %e, "rejected unverified notification");
        return Err(e);
    }
    state
        .store
        .set_verification_status(event_id, VerificationStatus::Verified)
        .await?;

    let payload: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            // Authentic but unparseable; redelivery of the same bytes can
            // never do better.
            return park(state, event_id, &format!("payload is not valid JSON: {e}")).await;
        }
    };

    let normalized = match adapter.normalize(&payload) {
        Ok(n) => n,
        Err(PipelineError::Permanent(reason)) => {
            return park(state, event_id, &reason).await;
        }
        Err(e) => return Err(e),
    };

    let event = match normalized {
        Normalized::Informational { event_name } => {
            state
                .store
                .set_processing_status(event_id, ProcessingStatus::Succeeded)
                .await?;
            tracing::info!(event_id = %event_id, event_name, "informational event acknowledged");
            return Ok(IngestOutcome::Informational);
        }
        Normalized::Event(ev) => ev,
    };

    state
        .store
        .set_normalized_type(event_id, event.kind.as_str())
        .await?;
    state
        .store
        .set_processing_status(event_id, ProcessingStatus::Processing)
        .await?;

    match applier::apply(&*state.store, &*state.notifier, &event).await {
        Ok(ApplyOutcome::Applied) => {
            state
                .store
                .set_processing_status(event_id, ProcessingStatus::Succeeded)
                .await?;
            Ok(IngestOutcome::Applied)
        }
        Ok(ApplyOutcome::Duplicate) => {
            state
                .store
                .set_processing_status(event_id, ProcessingStatus::Succeeded)
                .await?;
            Ok(IngestOutcome::Duplicate)
        }
        Err(e) if e.is_transient() => {
            retry::schedule(state, event_id, &event, &e.to_string()).await?;
            Ok(IngestOutcome::RetryScheduled)
        }
        Err(e) => park(state, event_id, &e.to_string()).await,
    }
}

/// Terminal parking for events that will never apply: straight to the
/// dead letter store, no ticket ever existed.
async fn park(
    state: &AppState,
    event_id: uuid::Uuid,
    reason: &str,
) -> Result<IngestOutcome, PipelineError> {
    state
        .store
        .convert_to_dead_letter(None, &NewDeadLetter::new(event_id, reason, 0))
        .await?;
    state
        .store
        .set_processing_status(event_id, ProcessingStatus::DeadLettered)
        .await?;
    tracing::error!(event_id = %event_id, reason, "event dead-lettered without retry");
    alerts::raise_or_log(
        &*state.store,
        AlertType::EventDeadLetter,
        &format!("event {event_id} cannot be applied: {reason}"),
        serde_json::json!({ "event_id": event_id, "reason": reason }),
    )
    .await;
    Ok(IngestOutcome::DeadLettered)
}
