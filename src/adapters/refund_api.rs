//! Staff-facing refund endpoints. Unlike the webhook surface these return
//! the specific taxonomy reason on failure.

use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::PipelineError,
            money::MoneyAmount,
            refund::{RefundAction, RefundRequest},
        },
        services::refunds,
    },
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
    },
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
pub struct CreateRefundBody {
    pub payment_id: Uuid,
    pub amount_cents: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub requester: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedRefundBody {
    pub refund: RefundRequest,
    pub advisory_percentage: u32,
}

pub async fn create_refund_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateRefundBody>,
) -> Result<(StatusCode, Json<CreatedRefundBody>), ApiError> {
    let amount = MoneyAmount::new(body.amount_cents)?;
    let created = refunds::create(
        &*state.store,
        refunds::CreateRefund {
            payment_id: body.payment_id,
            amount,
            reason: body.reason,
            notes: body.notes,
            requester: body.requester,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedRefundBody {
            refund: created.refund,
            advisory_percentage: created.advisory_percentage,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub actor: String,
    pub notes: Option<String>,
}

pub async fn approve_refund_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<RefundRequest>, ApiError> {
    let refund = refunds::approve(
        &*state.store,
        &*state.notifier,
        id,
        &body.actor,
        body.notes,
    )
    .await?;
    Ok(Json(refund))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub actor: String,
    pub reason: String,
}

pub async fn reject_refund_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectBody>,
) -> Result<Json<RefundRequest>, ApiError> {
    if body.reason.trim().is_empty() {
        return Err(PipelineError::Validation("rejection reason is required".into()).into());
    }
    let refund = refunds::reject(
        &*state.store,
        &*state.notifier,
        id,
        &body.actor,
        body.reason,
    )
    .await?;
    Ok(Json(refund))
}

#[derive(Debug, Deserialize)]
pub struct ProcessBody {
    pub actor: String,
}

pub async fn process_refund_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProcessBody>,
) -> Result<Json<RefundRequest>, ApiError> {
    let refund = refunds::process(
        &*state.store,
        &*state.gateway,
        &*state.notifier,
        id,
        &body.actor,
    )
    .await?;
    Ok(Json(refund))
}

#[derive(Debug, Serialize)]
pub struct RefundDetailBody {
    pub refund: RefundRequest,
    pub actions: Vec<RefundAction>,
}

pub async fn get_refund_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundDetailBody>, ApiError> {
    let (refund, actions) = refunds::fetch(&*state.store, id).await?;
    Ok(Json(RefundDetailBody { refund, actions }))
}
