use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("signature verification: {0}")]
    Verification(String),

    /// The event can never apply (referenced entity missing, payload
    /// unusable). Dead-lettered without retrying.
    #[error("permanent: {0}")]
    Permanent(String),

    /// Datastore or network hiccup. Retried with backoff.
    #[error("transient: {0}")]
    Transient(String),

    /// Outbound refund call to a payment gateway failed.
    #[error("gateway: {0}")]
    Gateway(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether a failed apply attempt should be rescheduled.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Database(_))
    }
}
