//! Deferred reconnects and connect attempts.
//!
//! Both run as detached tasks that report back to the driver's inbox. Each
//! holds a [`CancellationToken`] the driver keeps next to the state it
//! affects; cancellation is best-effort, so the driver also checks the
//! epoch of whatever arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::driver::{DriverMsg, Inbox, TransportEvent};
use crate::transport::Connector;

/// Cancels and clears a stored token, if any.
pub(crate) fn cancel_slot(slot: &mut Option<CancellationToken>) {
    if let Some(token) = slot.take() {
        token.cancel();
    }
}

/// Arms the single deferred reconnect for `epoch`.
pub(crate) fn spawn_reconnect_timer(
    epoch: u64,
    delay: Duration,
    inbox: Inbox,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                trace!(epoch, "reconnect timer cancelled");
            }
            _ = tokio::time::sleep(delay) => {
                let _ = inbox.send(DriverMsg::Event(TransportEvent::ReconnectDue { epoch }));
            }
        }
    });
}

/// Opens the transport for `epoch` and reports the outcome.
pub(crate) fn spawn_attempt(
    connector: Arc<dyn Connector>,
    url: String,
    epoch: u64,
    inbox: Inbox,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        debug!(epoch, url = %url, "opening transport");
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                trace!(epoch, "connect attempt cancelled");
                return;
            }
            r = connector.connect(&url) => r,
        };
        let event = match result {
            Ok(parts) => TransportEvent::Opened { epoch, parts },
            Err(error) => TransportEvent::Failed { epoch, error },
        };
        let _ = inbox.send(DriverMsg::Event(event));
    });
}
