use {
    super::PgStore,
    crate::domain::{
        error::PipelineError,
        event::{NewInboundEvent, ProcessingStatus, VerificationStatus},
        store::EventStore,
    },
    async_trait::async_trait,
    uuid::Uuid,
};

#[async_trait]
impl EventStore for PgStore {
    async fn insert_inbound_event(&self, event: &NewInboundEvent) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO inbound_events
                (id, provider, raw_payload, signature, verification_status, processing_status)
            VALUES ($1, $2, $3, $4, 'unverified', 'received')
            "#,
        )
        .bind(event.id)
        .bind(event.provider.as_str())
        .bind(&event.raw_payload)
        .bind(event.signature.as_deref())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_verification_status(
        &self,
        event_id: Uuid,
        status: VerificationStatus,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE inbound_events SET verification_status = $1, updated_at = now() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(event_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_normalized_type(
        &self,
        event_id: Uuid,
        normalized_type: &str,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE inbound_events SET normalized_type = $1, updated_at = now() WHERE id = $2",
        )
        .bind(normalized_type)
        .bind(event_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_processing_status(
        &self,
        event_id: Uuid,
        status: ProcessingStatus,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE inbound_events SET processing_status = $1, updated_at = now() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(event_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn claim_application(
        &self,
        external_id: &str,
        kind: &str,
    ) -> Result<bool, PipelineError> {
        let result = sqlx::query(
            r#"
            INSERT INTO applied_events (external_id, normalized_type)
            VALUES ($1, $2)
            ON CONFLICT (external_id, normalized_type) DO NOTHING
            "#,
        )
        .bind(external_id)
        .bind(kind)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn release_application(
        &self,
        external_id: &str,
        kind: &str,
    ) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM applied_events WHERE external_id = $1 AND normalized_type = $2")
            .bind(external_id)
            .bind(kind)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
