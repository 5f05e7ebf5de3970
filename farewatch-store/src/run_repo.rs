use async_trait::async_trait;
use farewatch_core::ports::{BoxError, RunRegistry};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgRunRegistry {
    pool: PgPool,
}

impl PgRunRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRegistry for PgRunRegistry {
    async fn claim(&self, run_key: &str, user_id: Uuid) -> Result<bool, BoxError> {
        // Insert-or-nothing on the primary key makes the claim atomic: the
        // first dispatcher to land the row wins, redeliveries see zero rows
        // affected.
        let result = sqlx::query(
            "INSERT INTO process_runs (run_key, user_id, started_at) \
             VALUES ($1, $2, now()) ON CONFLICT (run_key) DO NOTHING",
        )
        .bind(run_key)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
