//! Alert surface for the admin UI: list what is pending, acknowledge what
//! has been handled.

use {
    crate::{AppState, adapters::api_errors::ApiError, domain::alert::Alert, services::alerts},
    axum::{
        Json,
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
    },
    serde::Deserialize,
    uuid::Uuid,
};

const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

pub async fn list_alerts_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
    let pending = alerts::pending(&*state.store, limit).await?;
    Ok(Json(pending))
}

pub async fn acknowledge_alert_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let acknowledged = alerts::acknowledge(&*state.store, id).await?;
    if acknowledged {
        Ok((
            StatusCode::OK,
            Json(serde_json::json!({"acknowledged": true})),
        ))
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "alert not found"})),
        ))
    }
}
