//! In-memory doubles for the core ports, shared by the engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use farewatch_core::model::{
    Alert, AlertCriteria, AlertStatus, AlertType, CabinClass, DateRange, FlightOption,
    Notification, SearchRequest, SearchRequestStatus,
};
use farewatch_core::ports::{
    AlertQueue, AlertRepository, AwardAvailabilityProvider, BoxError, Mailer,
    NotificationRepository, SearchRequestRepository, TripStore, UserDirectory,
};
use farewatch_core::provider::{AwardAvailability, AwardPage, AwardSearchQuery, ProviderTrip};
use uuid::Uuid;

pub fn sample_alert(origin: &str, destination: &str) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        alert_type: AlertType::Daily,
        status: AlertStatus::Active,
        origin: origin.to_string(),
        destination: destination.to_string(),
        criteria: AlertCriteria {
            date_range: DateRange {
                start: NaiveDate::from_ymd_opt(2025, 10, 15).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            },
            cabin: Some(CabinClass::Economy),
            max_stops: None,
            airlines: None,
            max_price: None,
        },
        expires_at: None,
        created_at: Utc::now(),
    }
}

pub fn sample_flight(price: f64) -> FlightOption {
    FlightOption {
        flight_number: "UA837".to_string(),
        origin: "SFO".to_string(),
        destination: "NRT".to_string(),
        departure_time: Utc::now(),
        arrival_time: Utc::now() + chrono::Duration::hours(11),
        airline: "UA".to_string(),
        stops: 0,
        cabin: Some(CabinClass::Economy),
        remaining_seats: 4,
        price_amount: price,
        price_currency: "USD".to_string(),
    }
}

pub fn trip(id: &str) -> ProviderTrip {
    ProviderTrip {
        id: id.to_string(),
        origin_airport: "SFO".to_string(),
        destination_airport: "NRT".to_string(),
        departs_at: "2025-10-15".to_string(),
        flight_numbers: Some("UA837".to_string()),
        cabin: Some("economy".to_string()),
        mileage_cost: Some(35000),
        remaining_seats: Some(2),
        total_taxes: Some(serde_json::Number::from(5600u32)),
        taxes_currency: Some("USD".to_string()),
        source: Some("united".to_string()),
        extra: serde_json::Map::new(),
    }
}

pub fn award_page(
    count: i64,
    has_more: bool,
    cursor: Option<&str>,
    trips: Vec<ProviderTrip>,
) -> AwardPage {
    let data = if trips.is_empty() {
        vec![]
    } else {
        vec![AwardAvailability { trips: Some(trips) }]
    };
    AwardPage {
        count,
        has_more,
        cursor: cursor.map(str::to_string),
        data,
    }
}

#[derive(Default)]
pub struct FakeAlertRepo {
    alerts: Mutex<Vec<Alert>>,
    users: Vec<Uuid>,
    completed: Mutex<Vec<Uuid>>,
}

impl FakeAlertRepo {
    pub fn with_alerts(alerts: Vec<Alert>) -> Self {
        Self {
            alerts: Mutex::new(alerts),
            ..Default::default()
        }
    }

    pub fn with_users(users: Vec<Uuid>) -> Self {
        Self {
            users,
            ..Default::default()
        }
    }

    pub fn completed(&self) -> Vec<Uuid> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertRepository for FakeAlertRepo {
    async fn active_daily_alerts_for_user(&self, user_id: Uuid) -> Result<Vec<Alert>, BoxError> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id && a.status == AlertStatus::Active)
            .cloned()
            .collect())
    }

    async fn users_with_active_alerts(&self, _now: DateTime<Utc>) -> Result<Vec<Uuid>, BoxError> {
        Ok(self.users.clone())
    }

    async fn mark_completed(&self, alert_id: Uuid) -> Result<(), BoxError> {
        self.completed.lock().unwrap().push(alert_id);
        for alert in self.alerts.lock().unwrap().iter_mut() {
            if alert.id == alert_id {
                alert.status = AlertStatus::Completed;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotificationRepo {
    last_user: Mutex<Option<DateTime<Utc>>>,
    last_alert: Mutex<HashMap<Uuid, DateTime<Utc>>>,
    recorded: Mutex<Vec<Notification>>,
}

impl FakeNotificationRepo {
    pub fn set_last_for_user(&self, at: DateTime<Utc>) {
        *self.last_user.lock().unwrap() = Some(at);
    }

    pub fn set_last_for_alert(&self, alert_id: Uuid, at: DateTime<Utc>) {
        self.last_alert.lock().unwrap().insert(alert_id, at);
    }

    pub fn recorded(&self) -> Vec<Notification> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepository for FakeNotificationRepo {
    async fn last_sent_for_user(&self, _user_id: Uuid) -> Result<Option<DateTime<Utc>>, BoxError> {
        Ok(*self.last_user.lock().unwrap())
    }

    async fn last_notified_for_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, BoxError> {
        Ok(self.last_alert.lock().unwrap().get(&alert_id).copied())
    }

    async fn record(&self, notification: &Notification) -> Result<(), BoxError> {
        self.recorded.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FakeUserDirectory {
    emails: Mutex<HashMap<Uuid, String>>,
}

impl FakeUserDirectory {
    pub fn with_email(user_id: Uuid, email: &str) -> Self {
        let mut emails = HashMap::new();
        emails.insert(user_id, email.to_string());
        Self {
            emails: Mutex::new(emails),
        }
    }

    pub fn clear(&self) {
        self.emails.lock().unwrap().clear();
    }
}

#[async_trait]
impl UserDirectory for FakeUserDirectory {
    async fn email_for(&self, user_id: Uuid) -> Result<Option<String>, BoxError> {
        Ok(self.emails.lock().unwrap().get(&user_id).cloned())
    }
}

/// Keyed by origin airport; an origin of "ERR" simulates a provider outage.
pub struct FakeFlightProvider {
    flights: HashMap<String, Vec<FlightOption>>,
}

impl FakeFlightProvider {
    pub fn with_flights(origin: &str, flights: Vec<FlightOption>) -> Self {
        let mut map = HashMap::new();
        map.insert(origin.to_string(), flights);
        Self { flights: map }
    }
}

#[async_trait]
impl farewatch_core::ports::FlightSearchProvider for FakeFlightProvider {
    async fn search(
        &self,
        origin: &str,
        _destination: &str,
        _date_range: &DateRange,
        _criteria: &AlertCriteria,
    ) -> Result<Vec<FlightOption>, BoxError> {
        if origin == "ERR" {
            return Err("provider timeout".into());
        }
        Ok(self.flights.get(origin).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
}

impl FakeMailer {
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), BoxError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err("smtp connection refused".into());
        }
        self.sent.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeQueue {
    batches: Mutex<Vec<Vec<Uuid>>>,
    fail_at: Mutex<Option<usize>>,
    calls: Mutex<usize>,
}

impl FakeQueue {
    /// Fails the n-th enqueue call (1-based).
    pub fn fail_batch(&self, n: usize) {
        *self.fail_at.lock().unwrap() = Some(n);
    }

    pub fn batches(&self) -> Vec<Vec<Uuid>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertQueue for FakeQueue {
    async fn enqueue_users(&self, user_ids: &[Uuid]) -> Result<(), BoxError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *self.fail_at.lock().unwrap() == Some(*calls) {
            return Err("broker unavailable".into());
        }
        self.batches.lock().unwrap().push(user_ids.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedAwardProvider {
    pages: Mutex<VecDeque<AwardPage>>,
    calls: Mutex<Vec<AwardSearchQuery>>,
    fail: Mutex<Option<String>>,
}

impl ScriptedAwardProvider {
    pub fn with_pages(pages: Vec<AwardPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<AwardSearchQuery> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AwardAvailabilityProvider for ScriptedAwardProvider {
    async fn search(&self, query: &AwardSearchQuery) -> Result<AwardPage, BoxError> {
        if let Some(message) = self.fail.lock().unwrap().clone() {
            return Err(message.into());
        }
        self.calls.lock().unwrap().push(query.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "scripted provider exhausted".into())
    }
}

#[derive(Default)]
pub struct InMemorySearchRequests {
    rows: Mutex<HashMap<Uuid, SearchRequest>>,
    progress_writes: Mutex<HashMap<Uuid, usize>>,
}

impl InMemorySearchRequests {
    pub fn seed(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> SearchRequest {
        let request = new_request(origin, destination, start_date, end_date);
        self.rows
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        request
    }

    pub fn get(&self, id: Uuid) -> SearchRequest {
        self.rows.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn progress_writes(&self, id: Uuid) -> usize {
        self.progress_writes
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn force_progress(
        &self,
        id: Uuid,
        cursor: Option<&str>,
        has_more: bool,
        processed_count: i64,
    ) {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).unwrap();
        row.cursor = cursor.map(str::to_string);
        row.has_more = has_more;
        row.processed_count = processed_count;
    }

    pub fn force_status(&self, id: Uuid, status: SearchRequestStatus) {
        self.rows.lock().unwrap().get_mut(&id).unwrap().status = status;
    }
}

fn new_request(
    origin: &str,
    destination: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> SearchRequest {
    let now = Utc::now();
    SearchRequest {
        id: Uuid::new_v4(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        start_date,
        end_date,
        status: SearchRequestStatus::Processing,
        cursor: None,
        has_more: true,
        processed_count: 0,
        error_message: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl SearchRequestRepository for InMemorySearchRequests {
    async fn find(&self, id: Uuid) -> Result<Option<SearchRequest>, BoxError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_open_for_route(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<SearchRequest>, BoxError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                r.origin == origin
                    && r.destination == destination
                    && r.start_date == start_date
                    && r.end_date == end_date
                    && !r.status.is_terminal()
            })
            .cloned())
    }

    async fn create(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<SearchRequest, BoxError> {
        Ok(self.seed(origin, destination, start_date, end_date))
    }

    async fn save_progress(
        &self,
        id: Uuid,
        cursor: Option<&str>,
        has_more: bool,
        processed_count: i64,
    ) -> Result<(), BoxError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or("row missing")?;
        if row.cursor.is_none() {
            row.cursor = cursor.map(str::to_string);
        }
        row.has_more = has_more;
        row.processed_count = processed_count;
        row.updated_at = Utc::now();
        *self.progress_writes.lock().unwrap().entry(id).or_insert(0) += 1;
        Ok(())
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SearchRequestStatus,
        error_message: Option<&str>,
    ) -> Result<(), BoxError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or("row missing")?;
        if !row.status.is_terminal() {
            row.status = status;
            row.error_message = error_message.map(str::to_string);
            row.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTripStore {
    rows: Mutex<HashMap<String, ProviderTrip>>,
    calls: Mutex<Vec<usize>>,
}

impl InMemoryTripStore {
    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stored_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rows.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn stored(&self, id: &str) -> Option<ProviderTrip> {
        self.rows.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn upsert(
        &self,
        _search_request_id: Uuid,
        trips: &[ProviderTrip],
    ) -> Result<usize, BoxError> {
        self.calls.lock().unwrap().push(trips.len());
        let mut rows = self.rows.lock().unwrap();
        for t in trips {
            // Last write wins, like the real ON CONFLICT DO UPDATE.
            rows.insert(t.id.clone(), t.clone());
        }
        Ok(trips.len())
    }
}
