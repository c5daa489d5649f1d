//! Applies normalized events to booking/payment/refund state,
//! exactly-once-in-effect.

use crate::{
    domain::{
        alert::AlertType,
        error::PipelineError,
        event::{ApplyOutcome, EventKind, NormalizedEvent},
        gateway::NotificationDispatch,
        refund::{RefundAction, RefundStatus},
        store::{BookingStore, EventStore, RefundStore, Store},
    },
    services::alerts,
};

/// Applies one normalized event. Concurrency-safe across distinct events;
/// duplicate deliveries of the same (external id, kind) collapse into a
/// single effect through the storage uniqueness constraint.
///
/// Failure contract: `Transient` errors release the idempotency claim so a
/// rescheduled attempt can retake it; `Permanent` errors keep the claim,
/// which stops a gateway redelivery from producing a second dead letter.
pub async fn apply(
    store: &dyn Store,
    notifier: &dyn NotificationDispatch,
    event: &NormalizedEvent,
) -> Result<ApplyOutcome, PipelineError> {
    let (external_id, kind) = event.idempotency_key();

    if !store.claim_application(external_id, kind).await? {
        tracing::info!(external_id, kind, "duplicate delivery, already applied");
        return Ok(ApplyOutcome::Duplicate);
    }

    match apply_inner(store, notifier, event).await {
        Ok(()) => Ok(ApplyOutcome::Applied),
        Err(e) if e.is_transient() => {
            if let Err(release_err) = store.release_application(external_id, kind).await {
                tracing::error!(
                    external_id,
                    kind,
                    error = %release_err,
                    "failed to release idempotency claim after transient failure"
                );
            }
            Err(e)
        }
        Err(e) => Err(e),
    }
}

async fn apply_inner(
    store: &dyn Store,
    notifier: &dyn NotificationDispatch,
    event: &NormalizedEvent,
) -> Result<(), PipelineError> {
    match &event.kind {
        EventKind::PaymentSucceeded => {
            let payment = store
                .find_payment_by_gateway_ref(&event.external_id)
                .await?
                .ok_or_else(|| {
                    PipelineError::Permanent(format!(
                        "no payment for gateway ref {}",
                        event.external_id
                    ))
                })?;

            store
                .confirm_booking(&payment.booking_ref, &event.external_id)
                .await?;
            tracing::info!(
                booking_ref = %payment.booking_ref,
                gateway_ref = %event.external_id,
                "booking confirmed"
            );

            if let Err(e) = notifier.booking_confirmed(&payment.booking_ref).await {
                tracing::warn!(booking_ref = %payment.booking_ref, error = %e, "confirmation notice failed");
            }
        }

        EventKind::PaymentFailed { reason } => {
            let payment = store
                .find_payment_by_gateway_ref(&event.external_id)
                .await?
                .ok_or_else(|| {
                    PipelineError::Permanent(format!(
                        "no payment for gateway ref {}",
                        event.external_id
                    ))
                })?;

            store
                .fail_booking_payment(&payment.booking_ref, reason)
                .await?;
            tracing::warn!(
                booking_ref = %payment.booking_ref,
                reason,
                "payment failed"
            );

            if let Err(e) = notifier
                .booking_payment_failed(&payment.booking_ref, reason)
                .await
            {
                tracing::warn!(booking_ref = %payment.booking_ref, error = %e, "failure notice failed");
            }
        }

        EventKind::RefundCompleted { gateway_refund_id } => {
            let payment = store
                .find_payment_by_gateway_ref(&event.external_id)
                .await?
                .ok_or_else(|| {
                    PipelineError::Permanent(format!(
                        "no payment for gateway ref {}",
                        event.external_id
                    ))
                })?;

            let refund = store
                .find_active_refund_for_payment(payment.id)
                .await?
                .ok_or_else(|| {
                    PipelineError::Permanent(format!(
                        "no refund request for payment {}",
                        payment.id
                    ))
                })?;

            match refund.status {
                // Staff processing and the gateway confirmation can race;
                // whichever lands second sees Processed and is done.
                RefundStatus::Processed => {
                    tracing::info!(refund_id = %refund.id, "refund already processed");
                }
                RefundStatus::Approved => {
                    let swapped = store
                        .transition_refund(
                            refund.id,
                            RefundStatus::Approved,
                            RefundStatus::Processed,
                            Some(gateway_refund_id),
                        )
                        .await?;
                    if swapped {
                        store
                            .append_refund_action(&RefundAction::new(
                                refund.id,
                                "processed",
                                "gateway",
                                Some(format!("gateway refund {gateway_refund_id}")),
                            ))
                            .await?;
                        tracing::info!(
                            refund_id = %refund.id,
                            gateway_refund_id,
                            "refund confirmed by gateway"
                        );
                    } else {
                        // Lost the race; re-read to tell done from dead-end.
                        let current = store.find_refund(refund.id).await?;
                        match current.map(|r| r.status) {
                            Some(RefundStatus::Processed) => {
                                tracing::info!(refund_id = %refund.id, "refund processed concurrently");
                            }
                            other => {
                                return Err(PipelineError::Permanent(format!(
                                    "refund {} moved to {:?} before gateway confirmation",
                                    refund.id, other
                                )));
                            }
                        }
                    }
                }
                other => {
                    return Err(PipelineError::Permanent(format!(
                        "refund {} is {}, gateway confirmation cannot apply",
                        refund.id, other
                    )));
                }
            }
        }

        EventKind::DisputeOpened {
            reason,
            amount_cents,
        } => {
            alerts::raise_or_log(
                store,
                AlertType::GatewayDispute,
                &format!("dispute on {}: {reason}", event.external_id),
                serde_json::json!({
                    "gateway_ref": event.external_id,
                    "reason": reason,
                    "amount_cents": amount_cents,
                }),
            )
            .await;
        }

        EventKind::DeliverySucceeded { channel, recipient } => {
            store
                .update_delivery_status(*channel, &event.external_id, recipient, "delivered")
                .await?;
        }

        EventKind::DeliveryFailed {
            channel,
            recipient,
            permanent,
            reason,
        } => {
            store
                .update_delivery_status(*channel, &event.external_id, recipient, "failed")
                .await?;
            if *permanent {
                store.set_opt_out(*channel, recipient).await?;
            }
            alerts::raise_or_log(
                store,
                AlertType::DeliveryFailed,
                &format!("{channel} delivery to {recipient} failed: {reason}"),
                serde_json::json!({
                    "channel": channel.as_str(),
                    "recipient": recipient,
                    "permanent": permanent,
                    "reason": reason,
                }),
            )
            .await;
        }

        EventKind::RecipientOptedOut { channel, recipient } => {
            store
                .update_delivery_status(*channel, &event.external_id, recipient, "complaint")
                .await?;
            store.set_opt_out(*channel, recipient).await?;
            alerts::raise_or_log(
                store,
                AlertType::RecipientComplaint,
                &format!("complaint from {recipient}"),
                serde_json::json!({
                    "channel": channel.as_str(),
                    "recipient": recipient,
                }),
            )
            .await;
        }
    }

    Ok(())
}
