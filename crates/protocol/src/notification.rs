use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{NotificationKind, ReminderKind};

/// A normalized push notification.
///
/// Serializes with the wire field names so a history snapshot can be
/// replayed or dumped as the server sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub task_id: i64,
    pub task_title: String,
    #[serde(rename = "reminder_type")]
    pub reminder_kind: ReminderKind,
    pub message: String,
    #[serde(rename = "due_date", default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    /// Server timestamp, or local receipt time when the server sent none.
    #[serde(rename = "timestamp")]
    pub received_at: DateTime<Utc>,
}

impl Notification {
    /// One-line summary used by log lines and terminal sinks.
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {}: {}",
            self.reminder_kind.icon(),
            self.reminder_kind.label(),
            self.task_title,
            self.message
        )
    }
}

/// Parses an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// values, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
