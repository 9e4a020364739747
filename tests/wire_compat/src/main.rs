fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{DateTime, TimeZone, Utc};
    use taskbell_protocol::{InboundFrame, Notification, NotificationKind, ParseError, ReminderKind};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn parse(name: &str) -> Result<InboundFrame, ParseError> {
        InboundFrame::parse(&load_fixture(name), received())
    }

    fn notification(name: &str) -> Notification {
        match parse(name) {
            Ok(InboundFrame::Notification(n)) => n,
            other => panic!("{name}: expected notification, got {other:?}"),
        }
    }

    #[test]
    fn fixture_pong() {
        assert_eq!(parse("pong.json").unwrap(), InboundFrame::Heartbeat);
    }

    #[test]
    fn fixture_due_soon() {
        let n = notification("reminder_due_soon.json");
        assert_eq!(n.kind, NotificationKind::Reminder);
        assert_eq!(n.task_id, 12);
        assert_eq!(n.task_title, "Submit expense report");
        assert_eq!(n.reminder_kind, ReminderKind::DueSoon);
        assert_eq!(n.message, "Due in 15 minutes");
        assert_eq!(
            n.due_at,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 15, 0).unwrap())
        );
        assert_eq!(
            n.received_at,
            Utc.with_ymd_and_hms(2025, 3, 1, 11, 59, 58).unwrap()
        );
    }

    #[test]
    fn fixture_overdue_without_timestamp() {
        let n = notification("reminder_overdue.json");
        assert_eq!(n.reminder_kind, ReminderKind::Overdue);
        assert!(n.due_at.is_none());
        assert_eq!(n.received_at, received());
    }

    #[test]
    fn fixture_naive_server_timestamps() {
        let n = notification("reminder_naive_timestamps.json");
        assert_eq!(n.reminder_kind, ReminderKind::DueNow);
        assert_eq!(
            n.due_at,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(
            n.received_at.timestamp(),
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 1).unwrap().timestamp()
        );
    }

    #[test]
    fn fixture_unknown_reminder_type_is_kept() {
        let n = notification("reminder_unknown_type.json");
        assert_eq!(n.reminder_kind, ReminderKind::Unknown("snoozed".into()));
        assert_eq!(n.reminder_kind.label(), "snoozed");
    }

    #[test]
    fn fixture_string_task_id() {
        assert_eq!(notification("reminder_string_task_id.json").task_id, 77);
    }

    #[test]
    fn fixture_missing_task_id() {
        assert!(matches!(
            parse("invalid_missing_task_id.json"),
            Err(ParseError::MissingField("task_id"))
        ));
    }

    #[test]
    fn fixture_array_is_rejected() {
        assert!(matches!(
            parse("invalid_array.json"),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn notification_serializes_with_wire_names() {
        let n = notification("reminder_due_soon.json");
        let value = serde_json::to_value(&n).unwrap();

        assert_eq!(value["type"], "reminder");
        assert_eq!(value["task_id"], 12);
        assert_eq!(value["reminder_type"], "due_soon");
        assert!(value.get("due_date").is_some());
        assert!(value.get("timestamp").is_some());

        let back: Notification = serde_json::from_value(value).unwrap();
        assert_eq!(back, n);
    }
}
