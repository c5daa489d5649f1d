//! Refund lifecycle: staff-driven transitions plus the outbound gateway
//! call, every step compare-and-swapped and logged to the action trail.

use {
    crate::domain::{
        alert::AlertType,
        error::PipelineError,
        gateway::{NotificationDispatch, RefundGateway},
        money::MoneyAmount,
        policy,
        refund::{RefundAction, RefundRequest, RefundStatus},
        store::{BookingStore, RefundStore, Store},
    },
    crate::services::alerts,
    uuid::Uuid,
};

#[derive(Debug, Clone)]
pub struct CreateRefund {
    pub payment_id: Uuid,
    pub amount: MoneyAmount,
    pub reason: String,
    pub notes: Option<String>,
    pub requester: String,
}

#[derive(Debug, Clone)]
pub struct CreatedRefund {
    pub refund: RefundRequest,
    pub advisory_percentage: u32,
}

/// Creates a pending request. At most one non-rejected request may exist
/// per payment; amounts above the advisory policy ceiling are accepted but
/// flagged for review.
pub async fn create(
    store: &dyn Store,
    req: CreateRefund,
) -> Result<CreatedRefund, PipelineError> {
    let payment = store
        .find_payment(req.payment_id)
        .await?
        .ok_or_else(|| PipelineError::Validation("payment not found".into()))?;

    if let Some(existing) = store.find_active_refund_for_payment(payment.id).await? {
        return Err(PipelineError::Validation(format!(
            "a refund request already exists for this payment (refund {}, {})",
            existing.id, existing.status
        )));
    }

    let days = store
        .booking_days_until_departure(&payment.booking_ref)
        .await?;
    let advisory_percentage = days.map(policy::advisory_percentage).unwrap_or(0);
    let flagged =
        policy::exceeds_advisory(payment.money.amount(), req.amount, advisory_percentage);

    let refund = RefundRequest::create(
        &payment,
        req.amount,
        req.reason,
        req.notes,
        req.requester.clone(),
        flagged,
    )?;

    store.insert_refund(&refund).await?;
    store
        .append_refund_action(&RefundAction::new(
            refund.id,
            "requested",
            &req.requester,
            Some("refund request created".into()),
        ))
        .await?;

    tracing::info!(
        refund_id = %refund.id,
        payment_id = %payment.id,
        amount = %refund.money.amount(),
        flagged,
        "refund requested"
    );

    Ok(CreatedRefund {
        refund,
        advisory_percentage,
    })
}

pub async fn approve(
    store: &dyn Store,
    notifier: &dyn NotificationDispatch,
    refund_id: Uuid,
    actor: &str,
    notes: Option<String>,
) -> Result<RefundRequest, PipelineError> {
    let refund = transition(
        store,
        refund_id,
        RefundStatus::Pending,
        RefundStatus::Approved,
        actor,
        "approved",
        notes,
    )
    .await?;

    if let Err(e) = notifier.refund_update(&refund, "approved").await {
        tracing::warn!(refund_id = %refund.id, error = %e, "approval notice failed");
    }
    Ok(refund)
}

pub async fn reject(
    store: &dyn Store,
    notifier: &dyn NotificationDispatch,
    refund_id: Uuid,
    actor: &str,
    reason: String,
) -> Result<RefundRequest, PipelineError> {
    let refund = transition(
        store,
        refund_id,
        RefundStatus::Pending,
        RefundStatus::Rejected,
        actor,
        "rejected",
        Some(reason),
    )
    .await?;

    if let Err(e) = notifier.refund_update(&refund, "rejected").await {
        tracing::warn!(refund_id = %refund.id, error = %e, "rejection notice failed");
    }
    Ok(refund)
}

/// Pushes an approved refund to the gateway. A failed or timed-out call
/// lands the request in `failed`, visible to an operator, never silently
/// retried.
pub async fn process(
    store: &dyn Store,
    gateway: &dyn RefundGateway,
    notifier: &dyn NotificationDispatch,
    refund_id: Uuid,
    actor: &str,
) -> Result<RefundRequest, PipelineError> {
    let refund = store
        .find_refund(refund_id)
        .await?
        .ok_or_else(|| PipelineError::Validation("refund not found".into()))?;

    if refund.status != RefundStatus::Approved {
        return Err(PipelineError::Validation(format!(
            "refund must be approved before processing, currently {}",
            refund.status
        )));
    }

    let payment = store
        .find_payment(refund.payment_id)
        .await?
        .ok_or_else(|| PipelineError::Validation("payment no longer exists".into()))?;

    let submitted = gateway
        .submit_refund(refund.method, &payment.gateway_ref, &refund.money, refund.id)
        .await;

    let gateway_refund = match submitted {
        Ok(g) => g,
        Err(e) => {
            let failed = store
                .transition_refund(
                    refund.id,
                    RefundStatus::Approved,
                    RefundStatus::Failed,
                    None,
                )
                .await?;
            if failed {
                store
                    .append_refund_action(&RefundAction::new(
                        refund.id,
                        "failed",
                        actor,
                        Some(e.to_string()),
                    ))
                    .await?;
            }
            alerts::raise_or_log(
                store,
                AlertType::RefundProcessingFailed,
                &format!("refund {} gateway call failed: {e}", refund.id),
                serde_json::json!({ "refund_id": refund.id, "error": e.to_string() }),
            )
            .await;
            tracing::error!(refund_id = %refund.id, error = %e, "refund gateway call failed");
            return Err(PipelineError::Gateway(e.to_string()));
        }
    };

    let swapped = store
        .transition_refund(
            refund.id,
            RefundStatus::Approved,
            RefundStatus::Processed,
            Some(&gateway_refund.refund_txn_id),
        )
        .await?;

    if swapped {
        store
            .append_refund_action(&RefundAction::new(
                refund.id,
                "processed",
                actor,
                Some(format!("gateway refund {}", gateway_refund.refund_txn_id)),
            ))
            .await?;
        tracing::info!(
            refund_id = %refund.id,
            gateway_refund_id = %gateway_refund.refund_txn_id,
            "refund processed"
        );
    } else {
        // The gateway's own completion event beat us to the swap.
        tracing::info!(refund_id = %refund.id, "refund already processed concurrently");
    }

    let updated = store
        .find_refund(refund.id)
        .await?
        .ok_or_else(|| PipelineError::Validation("refund disappeared".into()))?;

    if let Err(e) = notifier.refund_update(&updated, "processed").await {
        tracing::warn!(refund_id = %updated.id, error = %e, "processed notice failed");
    }
    Ok(updated)
}

pub async fn fetch(
    store: &dyn Store,
    refund_id: Uuid,
) -> Result<(RefundRequest, Vec<RefundAction>), PipelineError> {
    let refund = store
        .find_refund(refund_id)
        .await?
        .ok_or_else(|| PipelineError::Validation("refund not found".into()))?;
    let actions = store.refund_actions(refund_id).await?;
    Ok((refund, actions))
}

/// Shared compare-and-swap transition with action logging. Refuses with
/// the current status spelled out when the precondition does not hold.
async fn transition(
    store: &dyn Store,
    refund_id: Uuid,
    expected: RefundStatus,
    next: RefundStatus,
    actor: &str,
    action: &str,
    notes: Option<String>,
) -> Result<RefundRequest, PipelineError> {
    let refund = store
        .find_refund(refund_id)
        .await?
        .ok_or_else(|| PipelineError::Validation("refund not found".into()))?;

    let swapped = store
        .transition_refund(refund_id, expected, next, None)
        .await?;
    if !swapped {
        let current = store
            .find_refund(refund_id)
            .await?
            .map(|r| r.status)
            .unwrap_or(refund.status);
        return Err(PipelineError::Validation(format!(
            "cannot {action} a {current} refund"
        )));
    }

    store
        .append_refund_action(&RefundAction::new(refund_id, action, actor, notes))
        .await?;
    tracing::info!(refund_id = %refund_id, action, actor, "refund transition");

    store
        .find_refund(refund_id)
        .await?
        .ok_or_else(|| PipelineError::Validation("refund disappeared".into()))
}
