use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farewatch_core::model::Notification;
use farewatch_core::ports::{BoxError, NotificationRepository};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn last_sent_for_user(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, BoxError> {
        let last = sqlx::query_scalar(
            "SELECT sent_at FROM notifications \
             WHERE user_id = $1 AND status = 'sent' \
             ORDER BY sent_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(last)
    }

    async fn last_notified_for_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, BoxError> {
        let last = sqlx::query_scalar(
            "SELECT n.sent_at FROM notifications n \
             JOIN notification_alerts na ON na.notification_id = n.id \
             WHERE na.alert_id = $1 ORDER BY n.sent_at DESC LIMIT 1",
        )
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(last)
    }

    async fn record(&self, notification: &Notification) -> Result<(), BoxError> {
        // Row plus alert joins land together; the dedup queries above depend
        // on both being visible at once.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO notifications \
             (id, user_id, channel, recipient, subject, status, error_message, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.channel)
        .bind(&notification.recipient)
        .bind(&notification.subject)
        .bind(notification.status.as_str())
        .bind(notification.error_message.as_deref())
        .bind(notification.sent_at)
        .execute(&mut *tx)
        .await?;

        for alert_id in &notification.alert_ids {
            sqlx::query(
                "INSERT INTO notification_alerts (notification_id, alert_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(notification.id)
            .bind(alert_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
