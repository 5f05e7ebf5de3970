use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use farewatch_core::model::{
    Alert, AlertCriteria, AlertStatus, AlertType, CabinClass, DateRange,
};
use farewatch_core::ports::{AlertRepository, BoxError};
use farewatch_core::CoreError;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgAlertRepository {
    pool: PgPool,
}

impl PgAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    user_id: Uuid,
    alert_type: String,
    status: String,
    origin: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    cabin: Option<String>,
    max_stops: Option<i32>,
    airlines: Option<Vec<String>>,
    max_price: Option<f64>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = CoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let alert_type = AlertType::parse(&row.alert_type)
            .ok_or_else(|| CoreError::ValidationError(format!("alert type {}", row.alert_type)))?;
        let status = AlertStatus::parse(&row.status)
            .ok_or_else(|| CoreError::ValidationError(format!("alert status {}", row.status)))?;
        let cabin = match row.cabin.as_deref() {
            Some(s) => Some(CabinClass::from_alias(s).ok_or_else(|| {
                CoreError::ValidationError(format!("cabin class {s} on alert {}", row.id))
            })?),
            None => None,
        };

        Ok(Alert {
            id: row.id,
            user_id: row.user_id,
            alert_type,
            status,
            origin: row.origin,
            destination: row.destination,
            criteria: AlertCriteria {
                date_range: DateRange {
                    start: row.start_date,
                    end: row.end_date,
                },
                cabin,
                max_stops: row.max_stops,
                airlines: row.airlines,
                max_price: row.max_price,
            },
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

const ALERT_COLUMNS: &str = "id, user_id, alert_type, status, origin, destination, start_date, \
                             end_date, cabin, max_stops, airlines, max_price, expires_at, created_at";

#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn active_daily_alerts_for_user(&self, user_id: Uuid) -> Result<Vec<Alert>, BoxError> {
        let rows: Vec<AlertRow> = sqlx::query_as(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             WHERE user_id = $1 AND status = 'active' AND alert_type = 'daily' \
             ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| Alert::try_from(r).map_err(BoxError::from))
            .collect()
    }

    async fn users_with_active_alerts(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, BoxError> {
        let users: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM alerts \
             WHERE status = 'active' AND alert_type = 'daily' \
               AND (expires_at IS NULL OR expires_at >= $1) \
             ORDER BY user_id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn mark_completed(&self, alert_id: Uuid) -> Result<(), BoxError> {
        sqlx::query("UPDATE alerts SET status = 'completed', updated_at = now() WHERE id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
