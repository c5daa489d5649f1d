//! Inbound webhook endpoints, one per provider family. Responses are a
//! small status body, never business data.

use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::event::Provider,
        services::pipeline::{self, IngestOutcome},
    },
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
    },
};

async fn handle(
    state: AppState,
    provider: Provider,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = pipeline::ingest(&state, provider, &headers, &body).await?;
    let response = match outcome {
        IngestOutcome::Applied
        | IngestOutcome::Duplicate
        | IngestOutcome::Informational
        | IngestOutcome::DeadLettered => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "accepted"})),
        ),
        // Tell the gateway the first attempt failed; our own retry ticket
        // and their redelivery race harmlessly into the idempotency gate.
        IngestOutcome::RetryScheduled => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"status": "error"})),
        ),
    };
    Ok(response)
}

pub async fn card_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    handle(state, Provider::CardGateway, headers, body).await
}

pub async fn wallet_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    handle(state, Provider::WalletGateway, headers, body).await
}

pub async fn sms_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    handle(state, Provider::SmsProvider, headers, body).await
}

pub async fn email_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    handle(state, Provider::EmailProvider, headers, body).await
}
