use {
    super::PgStore,
    crate::domain::{
        error::PipelineError,
        money::{Currency, Money, MoneyAmount},
        payment::PaymentMethod,
        refund::{RefundAction, RefundRequest, RefundStatus},
        store::RefundStore,
    },
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct RefundRow {
    id: Uuid,
    payment_id: Uuid,
    booking_ref: String,
    requester: String,
    amount_cents: i64,
    currency: String,
    reason: String,
    notes: Option<String>,
    processing_fee_cents: i64,
    net_refund_cents: i64,
    method: String,
    status: String,
    gateway_refund_id: Option<String>,
    flagged_for_review: bool,
    requested_at: DateTime<Utc>,
}

impl RefundRow {
    fn into_request(self) -> Result<RefundRequest, PipelineError> {
        Ok(RefundRequest {
            id: self.id,
            payment_id: self.payment_id,
            booking_ref: self.booking_ref,
            requester: self.requester,
            money: Money::new(
                MoneyAmount::new(self.amount_cents)?,
                Currency::try_from(self.currency.as_str())?,
            ),
            reason: self.reason,
            notes: self.notes,
            processing_fee: MoneyAmount::new(self.processing_fee_cents)?,
            net_refund: MoneyAmount::new(self.net_refund_cents)?,
            method: PaymentMethod::try_from(self.method.as_str())?,
            status: RefundStatus::try_from(self.status.as_str())?,
            gateway_refund_id: self.gateway_refund_id,
            flagged_for_review: self.flagged_for_review,
            requested_at: self.requested_at,
        })
    }
}

const REFUND_COLUMNS: &str = "id, payment_id, booking_ref, requester, amount_cents, currency, \
     reason, notes, processing_fee_cents, net_refund_cents, method, status, gateway_refund_id, \
     flagged_for_review, requested_at";

#[async_trait]
impl RefundStore for PgStore {
    async fn insert_refund(&self, refund: &RefundRequest) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO refunds
                (id, payment_id, booking_ref, requester, amount_cents, currency, reason, notes,
                 processing_fee_cents, net_refund_cents, method, status, gateway_refund_id,
                 flagged_for_review, requested_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(refund.id)
        .bind(refund.payment_id)
        .bind(&refund.booking_ref)
        .bind(&refund.requester)
        .bind(refund.money.amount().cents())
        .bind(refund.money.currency().as_str())
        .bind(&refund.reason)
        .bind(refund.notes.as_deref())
        .bind(refund.processing_fee.cents())
        .bind(refund.net_refund.cents())
        .bind(refund.method.as_str())
        .bind(refund.status.as_str())
        .bind(refund.gateway_refund_id.as_deref())
        .bind(refund.flagged_for_review)
        .bind(refund.requested_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_refund(&self, id: Uuid) -> Result<Option<RefundRequest>, PipelineError> {
        let row: Option<RefundRow> = sqlx::query_as(&format!(
            "SELECT {REFUND_COLUMNS} FROM refunds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(RefundRow::into_request).transpose()
    }

    async fn find_active_refund_for_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<RefundRequest>, PipelineError> {
        let row: Option<RefundRow> = sqlx::query_as(&format!(
            r#"
            SELECT {REFUND_COLUMNS} FROM refunds
            WHERE payment_id = $1 AND status <> 'rejected'
            ORDER BY requested_at DESC
            LIMIT 1
            "#
        ))
        .bind(payment_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(RefundRow::into_request).transpose()
    }

    async fn transition_refund(
        &self,
        id: Uuid,
        expected: RefundStatus,
        next: RefundStatus,
        gateway_refund_id: Option<&str>,
    ) -> Result<bool, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE refunds
            SET status = $3,
                gateway_refund_id = COALESCE($4, gateway_refund_id),
                updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(gateway_refund_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_refund_action(&self, action: &RefundAction) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO refund_actions (id, refund_id, action, actor, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(action.id)
        .bind(action.refund_id)
        .bind(&action.action)
        .bind(&action.actor)
        .bind(action.notes.as_deref())
        .bind(action.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn refund_actions(&self, refund_id: Uuid) -> Result<Vec<RefundAction>, PipelineError> {
        let rows: Vec<(Uuid, Uuid, String, String, Option<String>, DateTime<Utc>)> =
            sqlx::query_as(
                r#"
                SELECT id, refund_id, action, actor, notes, created_at
                FROM refund_actions
                WHERE refund_id = $1
                ORDER BY created_at
                "#,
            )
            .bind(refund_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, refund_id, action, actor, notes, created_at)| RefundAction {
                    id,
                    refund_id,
                    action,
                    actor,
                    notes,
                    created_at,
                },
            )
            .collect())
    }
}
