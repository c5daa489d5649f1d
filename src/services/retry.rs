//! Backoff scheduling and the background sweep that drains due tickets.

use {
    crate::{
        AppState,
        domain::{
            alert::AlertType,
            error::PipelineError,
            event::{NormalizedEvent, ProcessingStatus},
            retry::{NewDeadLetter, NewRetryTicket, RetryTicket},
            store::{EventStore, RetryStore},
        },
        services::{alerts, applier},
    },
    chrono::{Duration, Utc},
    tokio::sync::watch,
    uuid::Uuid,
};

const BASE_DELAY_SECS: i64 = 60;
const MAX_DELAY_SECS: i64 = 300;
const SWEEP_INTERVAL_SECS: u64 = 30;
const SWEEP_BATCH: i64 = 50;

/// `min(300s, 60s * 2^attempts)`: 60, 120, 240, then capped at 300.
pub fn backoff_delay(attempt_count: i32) -> Duration {
    let shift = attempt_count.clamp(0, 30) as u32;
    let delay = BASE_DELAY_SECS
        .saturating_mul(1i64 << shift)
        .min(MAX_DELAY_SECS);
    Duration::seconds(delay)
}

/// Books the first re-delivery after a synchronous attempt failed
/// transiently. The ticket starts at attempt 0 and stores the normalized
/// event so the sweep does not re-normalize.
pub async fn schedule(
    state: &AppState,
    event_id: Uuid,
    event: &NormalizedEvent,
    error: &str,
) -> Result<(), PipelineError> {
    let ticket = NewRetryTicket::new(
        event_id,
        serde_json::to_value(event)?,
        Utc::now() + backoff_delay(0),
        error,
    );
    state.store.insert_ticket(&ticket).await?;
    state
        .store
        .set_processing_status(event_id, ProcessingStatus::RetryScheduled)
        .await?;
    tracing::warn!(
        event_id = %event_id,
        external_id = %event.external_id,
        error,
        "transient failure, retry scheduled"
    );
    Ok(())
}

/// Sweep loop. The body is awaited before the next tick, so two sweeps
/// never run against the same ticket set.
pub async fn run_sweeper(state: AppState, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("retry sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("retry sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS)) => {}
        }

        match sweep_once(&state).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "retry sweep processed tickets"),
            Err(e) => tracing::error!(error = %e, "retry sweep error"),
        }
    }
}

/// Re-attempts every due ticket once. Success deletes the ticket; a
/// transient failure reschedules with backoff until attempts run out, at
/// which point the ticket becomes a dead letter in one atomic store call.
pub async fn sweep_once(state: &AppState) -> Result<u64, PipelineError> {
    let due = state.store.due_tickets(Utc::now(), SWEEP_BATCH).await?;
    let mut processed = 0u64;

    for ticket in due {
        processed += 1;
        let event: NormalizedEvent = match serde_json::from_value(ticket.payload.clone()) {
            Ok(ev) => ev,
            Err(e) => {
                // Unreadable payload can never succeed.
                dead_letter(state, &ticket, &format!("unreadable ticket payload: {e}")).await?;
                continue;
            }
        };

        match applier::apply(&*state.store, &*state.notifier, &event).await {
            Ok(outcome) => {
                state.store.delete_ticket(ticket.id).await?;
                state
                    .store
                    .set_processing_status(ticket.event_id, ProcessingStatus::Succeeded)
                    .await?;
                tracing::info!(
                    event_id = %ticket.event_id,
                    attempt = ticket.attempt_count,
                    ?outcome,
                    "retry succeeded"
                );
            }
            Err(e) if e.is_transient() => {
                let attempts = ticket.attempt_count + 1;
                if attempts >= ticket.max_retries {
                    dead_letter(state, &ticket, &e.to_string()).await?;
                } else {
                    let next = Utc::now() + backoff_delay(attempts);
                    state
                        .store
                        .reschedule_ticket(ticket.id, attempts, next, &e.to_string())
                        .await?;
                    tracing::warn!(
                        event_id = %ticket.event_id,
                        attempt = attempts,
                        next_retry_at = %next,
                        "retry failed, rescheduled"
                    );
                }
            }
            Err(e) => {
                // Permanent failure discovered on re-delivery.
                dead_letter(state, &ticket, &e.to_string()).await?;
            }
        }
    }

    Ok(processed)
}

async fn dead_letter(
    state: &AppState,
    ticket: &RetryTicket,
    reason: &str,
) -> Result<(), PipelineError> {
    let attempts = ticket.attempt_count + 1;
    state
        .store
        .convert_to_dead_letter(
            Some(ticket.id),
            &NewDeadLetter::new(ticket.event_id, reason, attempts),
        )
        .await?;
    state
        .store
        .set_processing_status(ticket.event_id, ProcessingStatus::DeadLettered)
        .await?;
    tracing::error!(
        event_id = %ticket.event_id,
        attempts,
        reason,
        "event dead-lettered"
    );
    alerts::raise_or_log(
        &*state.store,
        AlertType::EventDeadLetter,
        &format!("event {} failed permanently after {attempts} attempts", ticket.event_id),
        serde_json::json!({
            "event_id": ticket.event_id,
            "attempts": attempts,
            "reason": reason,
        }),
    )
    .await;
    Ok(())
}
