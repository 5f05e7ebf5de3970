use chrono::{DateTime, Duration, Timelike, Utc};

/// Notifications go out only between 18:00 and 22:00 UTC.
pub const SEND_WINDOW_START_HOUR: u32 = 18;
pub const SEND_WINDOW_END_HOUR: u32 = 22;

/// A user gets at most one email per 24 hours, across all alerts.
pub const COOLDOWN_HOURS: i64 = 24;

/// Per-alert dedup window, one hour shorter than the user-level cooldown.
pub const DEDUP_WINDOW_HOURS: i64 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBlock {
    OutsideWindow,
    SentRecently,
}

impl SendBlock {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendBlock::OutsideWindow => "outside time window",
            SendBlock::SentRecently => "sent recently",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendDecision {
    pub allowed: bool,
    pub reason: Option<SendBlock>,
}

impl SendDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn blocked(reason: SendBlock) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Gate before any per-user processing: the current UTC hour must fall inside
/// the send window, and the user's most recent notification (of any alert)
/// must be at least `COOLDOWN_HOURS` old. No prior notification means the
/// cooldown does not apply.
pub fn can_send_now(now: DateTime<Utc>, last_sent_at: Option<DateTime<Utc>>) -> SendDecision {
    let hour = now.hour();
    if hour < SEND_WINDOW_START_HOUR || hour >= SEND_WINDOW_END_HOUR {
        return SendDecision::blocked(SendBlock::OutsideWindow);
    }

    if let Some(last) = last_sent_at {
        if now - last < Duration::hours(COOLDOWN_HOURS) {
            return SendDecision::blocked(SendBlock::SentRecently);
        }
    }

    SendDecision::allowed()
}

/// Per-alert dedup check: true when the alert produced a notification within
/// the last `DEDUP_WINDOW_HOURS`. Independent of the user-level gate.
pub fn processed_recently(now: DateTime<Utc>, last_notified_at: Option<DateTime<Utc>>) -> bool {
    match last_notified_at {
        Some(last) => now - last < Duration::hours(DEDUP_WINDOW_HOURS),
        None => false,
    }
}
