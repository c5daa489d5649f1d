use {
    super::PgStore,
    crate::domain::{
        error::PipelineError,
        event::DeliveryChannel,
        money::{Currency, Money, MoneyAmount},
        payment::{PaymentMethod, PaymentRecord},
        store::BookingStore,
    },
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_ref: String,
    gateway_ref: String,
    method: String,
    amount_cents: i64,
    currency: String,
}

impl PaymentRow {
    fn into_record(self) -> Result<PaymentRecord, PipelineError> {
        Ok(PaymentRecord {
            id: self.id,
            booking_ref: self.booking_ref,
            gateway_ref: self.gateway_ref,
            method: PaymentMethod::try_from(self.method.as_str())?,
            money: Money::new(
                MoneyAmount::new(self.amount_cents)?,
                Currency::try_from(self.currency.as_str())?,
            ),
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, booking_ref, gateway_ref, method, amount_cents, currency";

#[async_trait]
impl BookingStore for PgStore {
    async fn find_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>, PipelineError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(PaymentRow::into_record).transpose()
    }

    async fn find_payment_by_gateway_ref(
        &self,
        gateway_ref: &str,
    ) -> Result<Option<PaymentRecord>, PipelineError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_ref = $1"
        ))
        .bind(gateway_ref)
        .fetch_optional(self.pool())
        .await?;
        row.map(PaymentRow::into_record).transpose()
    }

    async fn confirm_booking(
        &self,
        booking_ref: &str,
        gateway_ref: &str,
    ) -> Result<(), PipelineError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_status = 'completed', paid_at = now()
            WHERE booking_ref = $1
            "#,
        )
        .bind(booking_ref)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE payments SET status = 'completed' WHERE gateway_ref = $1")
            .bind(gateway_ref)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fail_booking_payment(
        &self,
        booking_ref: &str,
        reason: &str,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'payment_failed', payment_status = 'failed', payment_error = $2
            WHERE booking_ref = $1
            "#,
        )
        .bind(booking_ref)
        .bind(reason)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn booking_days_until_departure(
        &self,
        booking_ref: &str,
    ) -> Result<Option<i64>, PipelineError> {
        let departure: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT departure_date FROM bookings WHERE booking_ref = $1")
                .bind(booking_ref)
                .fetch_optional(self.pool())
                .await?;
        Ok(departure.flatten().map(|d| (d - Utc::now()).num_days()))
    }

    async fn update_delivery_status(
        &self,
        channel: DeliveryChannel,
        message_ref: &str,
        recipient: &str,
        status: &str,
    ) -> Result<(), PipelineError> {
        // Matching by message ref or recipient mirrors how the providers
        // report; zero matched rows is fine, the log belongs to the
        // notifications subsystem.
        sqlx::query(
            r#"
            UPDATE delivery_log
            SET status = $4, updated_at = now()
            WHERE channel = $1 AND (message_ref = $2 OR recipient = $3)
            "#,
        )
        .bind(channel.as_str())
        .bind(message_ref)
        .bind(recipient)
        .bind(status)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_opt_out(
        &self,
        channel: DeliveryChannel,
        recipient: &str,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO opt_outs (channel, recipient)
            VALUES ($1, $2)
            ON CONFLICT (channel, recipient) DO NOTHING
            "#,
        )
        .bind(channel.as_str())
        .bind(recipient)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
