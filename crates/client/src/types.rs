//! Public types for the notification client.

use std::time::Duration;

use taskbell_protocol::Notification;
use taskbell_protocol::constants::{DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_INTERVAL};

use crate::error::TransportError;

/// Connection state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; a clean, resumable stop.
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open; frames are being dispatched.
    Connected,
    /// Connection lost, a deferred reconnect is scheduled.
    Reconnecting { attempt: u32 },
    /// Reconnect budget exhausted. Only a host `reconnect()` leaves this.
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Short label for status badges.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

/// Events broadcast to every subscriber of a client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Any state transition.
    StateChanged(ConnectionState),
    /// Transport opened.
    Connected,
    /// An established connection was lost or closed.
    Disconnected,
    /// A deferred reconnect was scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// A notification was received and added to the history.
    Notification(Notification),
    /// A transport error (connect failure or abrupt close).
    Error(String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Reconnect budget before entering [`ConnectionState::Closed`].
    pub max_reconnect_attempts: u32,
    /// Cadence of the optional `{"type":"ping"}` keep-alive. Off by default.
    pub ping_interval: Option<Duration>,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            ping_interval: None,
            event_capacity: 64,
        }
    }
}

/// Callback for received notifications.
pub type NotificationCallback = Box<dyn Fn(&Notification) + Send + Sync>;

/// Callback for connect/disconnect signals.
pub type SignalCallback = Box<dyn Fn() + Send + Sync>;

/// Callback for transport errors.
pub type ErrorCallback = Box<dyn Fn(&TransportError) + Send + Sync>;

/// Callback for state transitions.
pub type StateCallback = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Host-supplied sinks. All are optional and run on the client's driver
/// task, serialized with state transitions and frame dispatch.
#[derive(Default)]
pub struct ClientHandlers {
    pub on_notification: Option<NotificationCallback>,
    pub on_connect: Option<SignalCallback>,
    pub on_disconnect: Option<SignalCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_state_change: Option<StateCallback>,
}

impl ClientHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_notification(mut self, cb: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.on_notification = Some(Box::new(cb));
        self
    }

    pub fn on_connect(mut self, cb: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Box::new(cb));
        self
    }

    pub fn on_disconnect(mut self, cb: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Box::new(cb));
        self
    }

    pub fn on_error(mut self, cb: impl Fn(&TransportError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    pub fn on_state_change(mut self, cb: impl Fn(ConnectionState) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(Box::new(cb));
        self
    }
}

impl std::fmt::Debug for ClientHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandlers")
            .field("on_notification", &self.on_notification.is_some())
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
