use std::time::Duration;

use taskbell_protocol::Notification;
use tokio::time::Instant;

/// Delay before an entering toast becomes visible.
const DEFAULT_ENTER_MS: u64 = 10;

/// How long a toast stays up, measured from creation.
const DEFAULT_DISPLAY_MS: u64 = 5000;

/// Exit animation length, shared by automatic and manual exit.
const DEFAULT_EXIT_MS: u64 = 300;

/// Visibility phase of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastPhase {
    Entering,
    Visible,
    Exiting,
    Removed,
}

impl ToastPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Entering => "entering",
            Self::Visible => "visible",
            Self::Exiting => "exiting",
            Self::Removed => "removed",
        }
    }
}

/// A surfaced notification and where it is in its lifecycle.
#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub notification: Notification,
    pub phase: ToastPhase,
    pub created_at: Instant,
}

/// Phase change broadcast by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastEvent {
    pub id: u64,
    pub phase: ToastPhase,
}

/// Timer lengths for the toast lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastTimings {
    pub enter: Duration,
    pub display: Duration,
    pub exit: Duration,
}

impl Default for ToastTimings {
    fn default() -> Self {
        Self {
            enter: Duration::from_millis(DEFAULT_ENTER_MS),
            display: Duration::from_millis(DEFAULT_DISPLAY_MS),
            exit: Duration::from_millis(DEFAULT_EXIT_MS),
        }
    }
}
