use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::model::{
    Alert, AlertCriteria, DateRange, FlightOption, Notification, SearchRequest,
    SearchRequestStatus,
};
use crate::provider::{AwardPage, AwardSearchQuery, ProviderTrip};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read/write access to alert rows.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn active_daily_alerts_for_user(&self, user_id: Uuid) -> Result<Vec<Alert>, BoxError>;

    /// Distinct users with at least one active daily alert that has not
    /// expired by `now`.
    async fn users_with_active_alerts(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, BoxError>;

    async fn mark_completed(&self, alert_id: Uuid) -> Result<(), BoxError>;
}

/// Notification audit rows plus the lookups the eligibility gate needs.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Timestamp of the user's most recent successfully sent notification,
    /// across all alerts. Failed attempts do not start the cooldown.
    async fn last_sent_for_user(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, BoxError>;

    /// Timestamp of the most recent notification covering this alert.
    async fn last_notified_for_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, BoxError>;

    async fn record(&self, notification: &Notification) -> Result<(), BoxError>;
}

/// Pagination-run state rows.
#[async_trait]
pub trait SearchRequestRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<SearchRequest>, BoxError>;

    /// Non-terminal request for the route/date tuple, if one exists. The
    /// tuple is the idempotency key for starting a run.
    async fn find_open_for_route(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<SearchRequest>, BoxError>;

    async fn create(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<SearchRequest, BoxError>;

    /// Persists per-page progress. The cursor is only written when the row
    /// does not already hold one; it is immutable once set.
    async fn save_progress(
        &self,
        id: Uuid,
        cursor: Option<&str>,
        has_more: bool,
        processed_count: i64,
    ) -> Result<(), BoxError>;

    /// Moves the request to a terminal status. A no-op if already terminal.
    async fn finalize(
        &self,
        id: Uuid,
        status: SearchRequestStatus,
        error_message: Option<&str>,
    ) -> Result<(), BoxError>;
}

/// Idempotent writer for award trips, keyed by external trip id.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Upserts a batch; invalid records are skipped, the latest write wins on
    /// conflict. Returns the number of rows written.
    async fn upsert(
        &self,
        search_request_id: Uuid,
        trips: &[ProviderTrip],
    ) -> Result<usize, BoxError>;
}

/// Identity lookup: user id to email, or None when the user has no address.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn email_for(&self, user_id: Uuid) -> Result<Option<String>, BoxError>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), BoxError>;
}

/// The flight-option search provider consumed by the alert matcher.
#[async_trait]
pub trait FlightSearchProvider: Send + Sync {
    async fn search(
        &self,
        origin: &str,
        destination: &str,
        date_range: &DateRange,
        criteria: &AlertCriteria,
    ) -> Result<Vec<FlightOption>, BoxError>;
}

/// The cursor-paginated award-availability provider.
#[async_trait]
pub trait AwardAvailabilityProvider: Send + Sync {
    async fn search(&self, query: &AwardSearchQuery) -> Result<AwardPage, BoxError>;
}

/// Fan-out target: one call enqueues one batch of user ids.
#[async_trait]
pub trait AlertQueue: Send + Sync {
    async fn enqueue_users(&self, user_ids: &[Uuid]) -> Result<(), BoxError>;
}

/// Per-user-per-day dispatch claims backing the dispatcher's idempotency key.
#[async_trait]
pub trait RunRegistry: Send + Sync {
    /// Atomically claims `run_key`. Returns false when the key was already
    /// claimed, meaning a run for this user already started today.
    async fn claim(&self, run_key: &str, user_id: Uuid) -> Result<bool, BoxError>;
}
