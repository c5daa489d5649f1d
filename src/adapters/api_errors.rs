use crate::domain::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype bridging the domain error taxonomy onto HTTP. Webhook callers
/// only ever see the generic shape; staff endpoints get the specific
/// reason through the Validation/Gateway arms.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            PipelineError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            PipelineError::Verification(_) => (
                StatusCode::FORBIDDEN,
                "signature_rejected",
                "signature verification failed".to_string(),
            ),
            PipelineError::Gateway(msg) => {
                (StatusCode::BAD_GATEWAY, "gateway_error", msg.clone())
            }
            PipelineError::Transient(msg) => {
                tracing::warn!("transient error surfaced: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "temporarily_unavailable",
                    "temporarily unavailable".to_string(),
                )
            }
            PipelineError::Permanent(msg) => {
                tracing::error!("permanent error surfaced: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            PipelineError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            PipelineError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
