//! Postgres-backed store. One struct, trait impls split by concern.

mod alerts;
mod bookings;
mod events;
mod refunds;
mod retries;

use sqlx::PgPool;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
