use async_trait::async_trait;
use farewatch_core::ports::{BoxError, UserDirectory};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn email_for(&self, user_id: Uuid) -> Result<Option<String>, BoxError> {
        let email = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(email)
    }
}
