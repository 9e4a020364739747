//! Dispatch loop: turns inbound text frames into history entries and
//! sink invocations.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use taskbell_protocol::{InboundFrame, Notification};

use crate::error::TransportError;
use crate::history::NotificationHistory;
use crate::types::{ClientEvent, ClientHandlers, ConnectionState};

/// Fan-out to host callbacks and broadcast subscribers.
///
/// Every method runs synchronously on the driver task, so callbacks observe
/// events in the same total order as the state machine.
pub(crate) struct EventSinks {
    handlers: ClientHandlers,
    events_tx: broadcast::Sender<ClientEvent>,
}

impl EventSinks {
    pub(crate) fn new(handlers: ClientHandlers, events_tx: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            handlers,
            events_tx,
        }
    }

    // A send error only means nobody is subscribed.
    fn emit(&self, event: ClientEvent) {
        let _ = self.events_tx.send(event);
    }

    pub(crate) fn notification(&self, n: &Notification) {
        if let Some(cb) = &self.handlers.on_notification {
            cb(n);
        }
        self.emit(ClientEvent::Notification(n.clone()));
    }

    pub(crate) fn connected(&self) {
        if let Some(cb) = &self.handlers.on_connect {
            cb();
        }
        self.emit(ClientEvent::Connected);
    }

    pub(crate) fn disconnected(&self) {
        if let Some(cb) = &self.handlers.on_disconnect {
            cb();
        }
        self.emit(ClientEvent::Disconnected);
    }

    pub(crate) fn error(&self, err: &TransportError) {
        if let Some(cb) = &self.handlers.on_error {
            cb(err);
        }
        self.emit(ClientEvent::Error(err.to_string()));
    }

    pub(crate) fn state(&self, state: ConnectionState) {
        if let Some(cb) = &self.handlers.on_state_change {
            cb(state);
        }
        self.emit(ClientEvent::StateChanged(state));
    }

    pub(crate) fn reconnecting(&self, attempt: u32, delay: Duration) {
        self.emit(ClientEvent::Reconnecting { attempt, delay });
    }
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatched {
    Notification,
    Heartbeat,
    Dropped,
}

/// Sole writer of the notification history.
pub(crate) struct Dispatcher {
    history: Arc<RwLock<NotificationHistory>>,
}

impl Dispatcher {
    pub(crate) fn new(history: Arc<RwLock<NotificationHistory>>) -> Self {
        Self { history }
    }

    /// Parses one frame, records it and notifies the sinks.
    ///
    /// Malformed frames are logged and dropped; they never reach the host
    /// and never affect the connection.
    pub(crate) fn dispatch(&self, text: &str, sinks: &EventSinks) -> Dispatched {
        let frame = match InboundFrame::parse(text, Utc::now()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = text.len(), "dropping malformed frame");
                return Dispatched::Dropped;
            }
        };

        match frame {
            InboundFrame::Heartbeat => {
                trace!("heartbeat ack");
                Dispatched::Heartbeat
            }
            InboundFrame::Notification(n) => {
                debug!(
                    task_id = n.task_id,
                    reminder = %n.reminder_kind,
                    "notification received"
                );
                self.history
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(n.clone());
                sinks.notification(&n);
                Dispatched::Notification
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
