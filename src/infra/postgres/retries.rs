use {
    super::PgStore,
    crate::domain::{
        error::PipelineError,
        retry::{NewDeadLetter, NewRetryTicket, RetryTicket},
        store::RetryStore,
    },
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    event_id: Uuid,
    payload: serde_json::Value,
    attempt_count: i32,
    next_retry_at: DateTime<Utc>,
    max_retries: i32,
    last_error: String,
}

impl From<TicketRow> for RetryTicket {
    fn from(row: TicketRow) -> Self {
        RetryTicket {
            id: row.id,
            event_id: row.event_id,
            payload: row.payload,
            attempt_count: row.attempt_count,
            next_retry_at: row.next_retry_at,
            max_retries: row.max_retries,
            last_error: row.last_error,
        }
    }
}

#[async_trait]
impl RetryStore for PgStore {
    async fn insert_ticket(&self, ticket: &NewRetryTicket) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO retry_tickets (id, event_id, payload, next_retry_at, last_error)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(&ticket.payload)
        .bind(ticket.next_retry_at)
        .bind(&ticket.last_error)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn due_tickets(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RetryTicket>, PipelineError> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, payload, attempt_count, next_retry_at, max_retries, last_error
            FROM retry_tickets
            WHERE next_retry_at <= $1
            ORDER BY next_retry_at
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(RetryTicket::from).collect())
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM retry_tickets WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn reschedule_ticket(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            UPDATE retry_tickets
            SET attempt_count = $2, next_retry_at = $3, last_error = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt_count)
        .bind(next_retry_at)
        .bind(last_error)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn convert_to_dead_letter(
        &self,
        ticket_id: Option<Uuid>,
        record: &NewDeadLetter,
    ) -> Result<(), PipelineError> {
        let mut tx = self.pool().begin().await?;
        if let Some(ticket_id) = ticket_id {
            sqlx::query("DELETE FROM retry_tickets WHERE id = $1")
                .bind(ticket_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            r#"
            INSERT INTO dead_letters (id, event_id, reason, attempt_count)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id)
        .bind(record.event_id)
        .bind(&record.reason)
        .bind(record.attempt_count)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
