use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::constants::{HEARTBEAT_ACK_TYPE, MAX_FRAME_SIZE, NotificationKind, ReminderKind};
use crate::notification::{Notification, parse_timestamp};

/// Errors from parsing an inbound text frame.
///
/// These never escape the dispatch loop: a bad frame is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("frame too large ({0} bytes)")]
    TooLarge(usize),
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Server heartbeat acknowledgement. Carries no payload.
    Heartbeat,
    /// A push notification.
    Notification(Notification),
}

/// Loose wire shape. Every field is optional here so that missing fields
/// are reported by name instead of as a generic serde error.
#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(rename = "type", default)]
    msg_type: Option<String>,
    #[serde(default)]
    task_id: Option<serde_json::Value>,
    #[serde(default)]
    task_title: Option<String>,
    #[serde(default)]
    reminder_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl InboundFrame {
    /// Parses and classifies a text frame.
    ///
    /// `received_at` stamps notifications whose `timestamp` is absent or
    /// unreadable.
    pub fn parse(text: &str, received_at: DateTime<Utc>) -> Result<Self, ParseError> {
        if text.len() > MAX_FRAME_SIZE {
            return Err(ParseError::TooLarge(text.len()));
        }

        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(ParseError::NotAnObject);
        }
        let wire: WireFrame = serde_json::from_value(value)?;

        if wire.msg_type.as_deref() == Some(HEARTBEAT_ACK_TYPE) {
            return Ok(Self::Heartbeat);
        }

        let task_id = match wire.task_id {
            Some(v) => parse_task_id(&v)?,
            None => return Err(ParseError::MissingField("task_id")),
        };
        let task_title = wire
            .task_title
            .ok_or(ParseError::MissingField("task_title"))?;
        let message = wire.message.ok_or(ParseError::MissingField("message"))?;

        Ok(Self::Notification(Notification {
            kind: NotificationKind::from(wire.msg_type.unwrap_or_default()),
            task_id,
            task_title,
            reminder_kind: ReminderKind::from(wire.reminder_type.unwrap_or_default()),
            message,
            due_at: wire.due_date.as_deref().and_then(parse_timestamp),
            received_at: wire
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or(received_at),
        }))
    }
}

fn parse_task_id(value: &serde_json::Value) -> Result<i64, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidField {
        field: "task_id",
        reason: reason.to_string(),
    };
    match value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| invalid("not an integer")),
        serde_json::Value::String(s) => s.trim().parse().map_err(|_| invalid("not an integer")),
        _ => Err(invalid("expected integer")),
    }
}
