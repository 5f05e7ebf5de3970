use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Completed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AlertStatus::Active),
            "completed" => Some(AlertStatus::Completed),
            _ => None,
        }
    }
}

/// Only the daily recurring type drives the alert workflow today; the column
/// stays a string in storage so new types can land without a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Daily,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(AlertType::Daily),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Premium,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Premium => "premium",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }

    /// Normalizes the cabin strings the providers send. Each program uses its
    /// own vocabulary, so this is a small alias table rather than a straight
    /// parse.
    pub fn from_alias(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" | "eco" | "coach" | "y" => Some(CabinClass::Economy),
            "premium" | "premium_economy" | "premiumeconomy" | "w" => Some(CabinClass::Premium),
            "business" | "biz" | "j" => Some(CabinClass::Business),
            "first" | "f" => Some(CabinClass::First),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Filter criteria attached to an alert. All fields beyond the date range are
/// optional; an unset field means "do not narrow on this".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCriteria {
    pub date_range: DateRange,
    pub cabin: Option<CabinClass>,
    pub max_stops: Option<i32>,
    pub airlines: Option<Vec<String>>,
    pub max_price: Option<f64>,
}

/// A user's standing fare watch. Created elsewhere; the background workflow
/// only reads alerts and flips expired ones to `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    pub origin: String,
    pub destination: String,
    pub criteria: AlertCriteria,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchRequestStatus {
    Processing,
    Completed,
    Failed,
}

impl SearchRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchRequestStatus::Processing => "processing",
            SearchRequestStatus::Completed => "completed",
            SearchRequestStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(SearchRequestStatus::Processing),
            "completed" => Some(SearchRequestStatus::Completed),
            "failed" => Some(SearchRequestStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchRequestStatus::Processing)
    }
}

/// Tracks one award-availability pagination run for a fixed route and date
/// range. The cursor is captured from the first provider page and never
/// changes afterwards; `processed_count` only grows. Progress is persisted
/// after every page so a restarted run resumes at the right offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SearchRequestStatus,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub processed_count: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One candidate flight returned by the flight-option search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOption {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub airline: String,
    pub stops: i32,
    pub cabin: Option<CabinClass>,
    pub remaining_seats: i32,
    pub price_amount: f64,
    pub price_currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(NotificationStatus::Sent),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }
}

/// One outbound-email attempt, joined to the alerts it reported on. Written
/// once per processing attempt that reaches the send step, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub alert_ids: Vec<Uuid>,
}

impl Notification {
    pub fn email(
        user_id: Uuid,
        recipient: &str,
        subject: &str,
        status: NotificationStatus,
        error_message: Option<String>,
        sent_at: DateTime<Utc>,
        alert_ids: Vec<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            channel: "email".to_string(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            status,
            error_message,
            sent_at,
            alert_ids,
        }
    }
}

/// Storage row shape for one award-availability offer, produced by the
/// ingestion mapping from a raw provider trip. `external_id` is the natural
/// key; re-ingesting the same id overwrites the whole row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRow {
    pub external_id: String,
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub flight_numbers: Option<String>,
    pub cabin: Option<CabinClass>,
    pub mileage_cost: Option<i64>,
    pub remaining_seats: Option<i32>,
    pub total_taxes: Option<String>,
    pub taxes_currency: Option<String>,
    pub source: Option<String>,
    pub raw: serde_json::Value,
}
