//! Operational alerting with a rolling dedup window.

use {
    crate::domain::{
        alert::{Alert, AlertType, NewAlert},
        error::PipelineError,
        store::AlertStore,
    },
    chrono::{Duration, Utc},
    uuid::Uuid,
};

/// A second alert of the same type inside this window is suppressed while
/// the first is still unacknowledged.
pub const DEDUP_WINDOW_MINUTES: i64 = 30;

/// Inserts an alert unless an unacknowledged one of the same type exists
/// inside the dedup window. Returns whether a new alert was recorded.
/// Acknowledged alerts leave the window immediately, so the same type can
/// fire again right after an operator clears it.
pub async fn raise(
    store: &dyn AlertStore,
    alert_type: AlertType,
    message: &str,
    data: serde_json::Value,
) -> Result<bool, PipelineError> {
    let since = Utc::now() - Duration::minutes(DEDUP_WINDOW_MINUTES);
    if let Some(existing) = store.unsent_alert_since(alert_type.as_str(), since).await? {
        tracing::debug!(
            alert_type = %alert_type,
            existing_id = %existing.id,
            "alert suppressed, unacknowledged duplicate in window"
        );
        return Ok(false);
    }

    let alert = NewAlert::new(alert_type, message, data);
    store.insert_alert(&alert).await?;
    tracing::warn!(alert_type = %alert_type, alert_id = %alert.id, "{message}");
    Ok(true)
}

/// Best-effort variant for pipeline paths that must not fail because
/// alerting did: the error is logged, never propagated.
pub async fn raise_or_log(
    store: &dyn AlertStore,
    alert_type: AlertType,
    message: &str,
    data: serde_json::Value,
) {
    if let Err(e) = raise(store, alert_type, message, data).await {
        tracing::error!(alert_type = %alert_type, error = %e, "failed to record alert");
    }
}

pub async fn acknowledge(store: &dyn AlertStore, id: Uuid) -> Result<bool, PipelineError> {
    let acknowledged = store.mark_alert_sent(id).await?;
    if acknowledged {
        tracing::info!(alert_id = %id, "alert acknowledged");
    }
    Ok(acknowledged)
}

pub async fn pending(store: &dyn AlertStore, limit: i64) -> Result<Vec<Alert>, PipelineError> {
    store.pending_alerts(limit).await
}
