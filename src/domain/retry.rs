use {
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

/// Attempts a ticket may consume before conversion to a dead letter.
pub const MAX_RETRIES: i32 = 5;

/// A scheduled re-delivery of a normalized event that failed transiently.
/// Exactly one live ticket exists per event; success deletes it, exhaustion
/// converts it into a [`DeadLetterRecord`] in the same storage operation.
#[derive(Debug, Clone)]
pub struct RetryTicket {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Normalized event, serialized, so re-attempts skip re-normalization.
    pub payload: serde_json::Value,
    /// Failed sweep attempts consumed so far. 0 right after the
    /// synchronous attempt failed.
    pub attempt_count: i32,
    pub next_retry_at: DateTime<Utc>,
    pub max_retries: i32,
    pub last_error: String,
}

#[derive(Debug, Clone)]
pub struct NewRetryTicket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub payload: serde_json::Value,
    pub next_retry_at: DateTime<Utc>,
    pub last_error: String,
}

impl NewRetryTicket {
    pub fn new(
        event_id: Uuid,
        payload: serde_json::Value,
        next_retry_at: DateTime<Utc>,
        last_error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_id,
            payload,
            next_retry_at,
            last_error: last_error.into(),
        }
    }
}

/// Terminal record for an event that could not be applied. Never fed back
/// into the pipeline automatically.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetterRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub reason: String,
    pub attempt_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeadLetter {
    pub id: Uuid,
    pub event_id: Uuid,
    pub reason: String,
    pub attempt_count: i32,
}

impl NewDeadLetter {
    pub fn new(event_id: Uuid, reason: impl Into<String>, attempt_count: i32) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_id,
            reason: reason.into(),
            attempt_count,
        }
    }
}
