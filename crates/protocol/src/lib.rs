//! Wire protocol and domain model for taskbell push notifications.

pub mod constants;
pub mod frame;
pub mod notification;
pub mod target;

// Re-export primary types for convenience.
pub use constants::{NotificationKind, ReminderKind};
pub use frame::{InboundFrame, ParseError};
pub use notification::Notification;
pub use target::{ConfigError, ConnectTarget};
