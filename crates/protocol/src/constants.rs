use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum inbound frame size in bytes (1 MB).
///
/// Reminder frames are a few hundred bytes; anything near this limit is
/// malformed or hostile and is dropped before JSON parsing.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Number of notifications kept in the newest-first history.
pub const HISTORY_CAPACITY: usize = 50;

/// Default fixed delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default reconnect budget before the client gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Path segment under which the server exposes per-user sockets.
pub const WS_PATH_PREFIX: &str = "/ws";

/// Discriminator of the server's heartbeat acknowledgement.
pub const HEARTBEAT_ACK_TYPE: &str = "pong";

/// Discriminator of the client's optional keep-alive.
pub const HEARTBEAT_TYPE: &str = "ping";

/// Discriminator assumed when a frame carries no `type`.
pub const DEFAULT_NOTIFICATION_TYPE: &str = "reminder";

/// Reminder category carried in `reminder_type`.
///
/// Unknown wire values are preserved verbatim so a newer server can add
/// categories without the client dropping them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReminderKind {
    DueSoon,
    DueNow,
    Overdue,
    Recurring,
    Unknown(String),
}

impl ReminderKind {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::DueSoon => "due_soon",
            Self::DueNow => "due_now",
            Self::Overdue => "overdue",
            Self::Recurring => "recurring",
            Self::Unknown(raw) => raw,
        }
    }

    /// Human-readable label ("due soon", "overdue", ...).
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Glyph shown next to the reminder in terminal and toast renderers.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::DueSoon => "⏰",
            Self::DueNow => "🔔",
            Self::Overdue => "⚠️",
            Self::Recurring => "🔄",
            Self::Unknown(_) => "📌",
        }
    }
}

impl From<String> for ReminderKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "due_soon" => Self::DueSoon,
            "due_now" => Self::DueNow,
            "overdue" => Self::Overdue,
            "recurring" => Self::Recurring,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<ReminderKind> for String {
    fn from(kind: ReminderKind) -> Self {
        match kind {
            ReminderKind::Unknown(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level notification category carried in `type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Reminder,
    Other(String),
}

impl NotificationKind {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Reminder => DEFAULT_NOTIFICATION_TYPE,
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(raw: String) -> Self {
        if raw.is_empty() || raw == DEFAULT_NOTIFICATION_TYPE {
            Self::Reminder
        } else {
            Self::Other(raw)
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Reminder => DEFAULT_NOTIFICATION_TYPE.to_string(),
            NotificationKind::Other(raw) => raw,
        }
    }
}
