use std::sync::Arc;

use chrono::{DateTime, Utc};
use farewatch_core::eligibility::{can_send_now, processed_recently};
use farewatch_core::model::{Alert, Notification, NotificationStatus};
use farewatch_core::ports::{
    AlertRepository, BoxError, FlightSearchProvider, Mailer, NotificationRepository, UserDirectory,
};
use futures_util::future::join_all;
use tracing::info;
use uuid::Uuid;

use crate::email::compose_summary;
use crate::matcher::{fetch_flights_for_alerts, MAX_FLIGHTS_PER_ALERT};

pub const REASON_NO_EMAIL: &str = "no-email";
pub const REASON_NO_ALERTS: &str = "no-alerts";
pub const REASON_ALL_EXPIRED: &str = "all-expired";
pub const REASON_ALL_RECENT: &str = "all-recently-processed";
pub const REASON_NO_FLIGHTS: &str = "no-flights";
pub const REASON_EMAIL_FAILED: &str = "email-failed";

const NO_FLIGHTS_MESSAGE: &str = "No matching flights found";

/// Terminal result of one per-user run. Policy terminals are not errors;
/// only infrastructure failures escape `process_user` as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub success: bool,
    pub reason: Option<String>,
}

impl ProcessOutcome {
    fn sent() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    fn skipped(reason: &str) -> Self {
        Self {
            success: true,
            reason: Some(reason.to_string()),
        }
    }

    fn failed(reason: &str) -> Self {
        Self {
            success: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Orchestrates one user's daily alert run: eligibility gate, expiry sweep,
/// dedup filter, flight fetch, email send, and audit recording.
pub struct AlertProcessor {
    alerts: Arc<dyn AlertRepository>,
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserDirectory>,
    flights: Arc<dyn FlightSearchProvider>,
    mailer: Arc<dyn Mailer>,
}

impl AlertProcessor {
    pub fn new(
        alerts: Arc<dyn AlertRepository>,
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserDirectory>,
        flights: Arc<dyn FlightSearchProvider>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            alerts,
            notifications,
            users,
            flights,
            mailer,
        }
    }

    pub async fn process_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome, BoxError> {
        // Step 1: time window and cooldown.
        let last_sent = self.notifications.last_sent_for_user(user_id).await?;
        let decision = can_send_now(now, last_sent);
        if !decision.allowed {
            let reason = decision.reason.map(|r| r.as_str()).unwrap_or("blocked");
            info!(%user_id, reason, "skipping user, not eligible now");
            return Ok(ProcessOutcome::skipped(reason));
        }

        // Step 2: recipient.
        let Some(email) = self.users.email_for(user_id).await? else {
            info!(%user_id, "skipping user, no email on file");
            return Ok(ProcessOutcome::skipped(REASON_NO_EMAIL));
        };

        // Step 3: active daily alerts.
        let alerts = self.alerts.active_daily_alerts_for_user(user_id).await?;
        if alerts.is_empty() {
            return Ok(ProcessOutcome::skipped(REASON_NO_ALERTS));
        }

        // Step 4: expiry sweep.
        let (expired, live): (Vec<Alert>, Vec<Alert>) =
            alerts.into_iter().partition(|a| a.is_expired(now));
        if !expired.is_empty() {
            info!(%user_id, count = expired.len(), "marking expired alerts completed");
            let writes = join_all(expired.iter().map(|a| self.alerts.mark_completed(a.id))).await;
            for write in writes {
                write?;
            }
        }
        if live.is_empty() {
            return Ok(ProcessOutcome::skipped(REASON_ALL_EXPIRED));
        }

        // Step 5: per-alert dedup over the rolling window.
        let checks = join_all(live.iter().map(|a| async {
            self.notifications
                .last_notified_for_alert(a.id)
                .await
                .map(|last| (a.clone(), last))
        }))
        .await;
        let mut fresh = Vec::with_capacity(live.len());
        for check in checks {
            let (alert, last) = check?;
            if !processed_recently(now, last) {
                fresh.push(alert);
            }
        }
        if fresh.is_empty() {
            return Ok(ProcessOutcome::skipped(REASON_ALL_RECENT));
        }

        // Step 6: flight fetch.
        let matches =
            fetch_flights_for_alerts(self.flights.as_ref(), &fresh, MAX_FLIGHTS_PER_ALERT).await;
        let fresh_ids: Vec<Uuid> = fresh.iter().map(|a| a.id).collect();
        if matches.is_empty() {
            // Audited as a failed attempt even though no email goes out.
            let notification = Notification::email(
                user_id,
                &email,
                "FareWatch daily alert check",
                NotificationStatus::Failed,
                Some(NO_FLIGHTS_MESSAGE.to_string()),
                now,
                fresh_ids,
            );
            self.notifications.record(&notification).await?;
            return Ok(ProcessOutcome::skipped(REASON_NO_FLIGHTS));
        }

        // Step 7: compose and send one summary email.
        let (subject, body) = compose_summary(&matches);
        let covered_ids: Vec<Uuid> = matches.iter().map(|m| m.alert.id).collect();
        match self.mailer.send(&email, &subject, &body).await {
            Ok(()) => {
                let notification = Notification::email(
                    user_id,
                    &email,
                    &subject,
                    NotificationStatus::Sent,
                    None,
                    now,
                    covered_ids,
                );
                self.notifications.record(&notification).await?;
                info!(%user_id, alerts = matches.len(), "alert summary sent");
                Ok(ProcessOutcome::sent())
            }
            Err(err) => {
                let notification = Notification::email(
                    user_id,
                    &email,
                    &subject,
                    NotificationStatus::Failed,
                    Some(err.to_string()),
                    now,
                    covered_ids,
                );
                self.notifications.record(&notification).await?;
                Ok(ProcessOutcome::failed(REASON_EMAIL_FAILED))
            }
        }
    }
}
