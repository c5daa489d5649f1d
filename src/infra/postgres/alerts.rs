use {
    super::PgStore,
    crate::domain::{
        alert::{Alert, NewAlert},
        error::PipelineError,
        store::AlertStore,
    },
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    alert_type: String,
    message: String,
    data: serde_json::Value,
    sent: bool,
    created_at: DateTime<Utc>,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        Alert {
            id: row.id,
            alert_type: row.alert_type,
            message: row.message,
            data: row.data,
            sent: row.sent,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn insert_alert(&self, alert: &NewAlert) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO system_alerts (id, alert_type, message, data, sent)
            VALUES ($1, $2, $3, $4, false)
            "#,
        )
        .bind(alert.id)
        .bind(&alert.alert_type)
        .bind(&alert.message)
        .bind(&alert.data)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn unsent_alert_since(
        &self,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, PipelineError> {
        let row: Option<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, alert_type, message, data, sent, created_at
            FROM system_alerts
            WHERE alert_type = $1 AND sent = false AND created_at >= $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(alert_type)
        .bind(since)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Alert::from))
    }

    async fn pending_alerts(&self, limit: i64) -> Result<Vec<Alert>, PipelineError> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, alert_type, message, data, sent, created_at
            FROM system_alerts
            WHERE sent = false
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Alert::from).collect())
    }

    async fn mark_alert_sent(&self, id: Uuid) -> Result<bool, PipelineError> {
        let result = sqlx::query("UPDATE system_alerts SET sent = true WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
