//! Client facade.
//!
//! Bundles the connection state machine, dispatch loop and notification
//! history behind one owned handle. Construction spawns the driver task;
//! every method either reads shared snapshots or posts a command to the
//! driver and waits for its reply.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use taskbell_protocol::{ConnectTarget, Notification};

use crate::dispatch::{Dispatcher, EventSinks};
use crate::driver::{Command, Driver, DriverMsg, Inbox};
use crate::error::ClientError;
use crate::history::NotificationHistory;
use crate::transport::{Connector, WsConnector};
use crate::types::{ClientConfig, ClientEvent, ClientHandlers, ConnectionState};

/// Real-time notification client for one user.
///
/// Must be created inside a tokio runtime. Dropping the client stops the
/// driver, cancels any pending reconnect and closes the socket.
pub struct NotificationClient {
    inbox: Inbox,
    state_rx: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU32>,
    history: Arc<RwLock<NotificationHistory>>,
    events_tx: broadcast::Sender<ClientEvent>,
    shutdown: CancellationToken,
}

impl NotificationClient {
    /// Creates a client backed by the tokio-tungstenite transport.
    pub fn new(config: ClientConfig, handlers: ClientHandlers) -> Self {
        Self::with_connector(config, handlers, Arc::new(WsConnector))
    }

    /// Creates a client with a custom transport.
    pub fn with_connector(
        config: ClientConfig,
        handlers: ClientHandlers,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let history = Arc::new(RwLock::new(NotificationHistory::new()));
        let attempts = Arc::new(AtomicU32::new(0));
        let shutdown = CancellationToken::new();

        let driver = Driver::new(
            config,
            connector,
            Dispatcher::new(history.clone()),
            EventSinks::new(handlers, events_tx.clone()),
            inbox.clone(),
            state_tx,
            attempts.clone(),
        );
        tokio::spawn(driver.run(inbox_rx, shutdown.clone()));

        Self {
            inbox,
            state_rx,
            attempts,
            history,
            events_tx,
            shutdown,
        }
    }

    /// Connects to `target`.
    ///
    /// Returns the state after the command was applied: `Connecting` for a
    /// fresh attempt, or the current state if already connecting or
    /// connected. Transport failures are not returned here; they drive the
    /// reconnect policy and are reported through the sinks.
    pub async fn connect(&self, target: ConnectTarget) -> Result<ConnectionState, ClientError> {
        self.request(|reply| Command::Connect { target, reply }).await
    }

    /// Validates `url` and `user_id`, then connects.
    ///
    /// An invalid target fails immediately with [`ClientError::Config`] and
    /// is never retried.
    pub async fn connect_to(
        &self,
        url: &str,
        user_id: &str,
    ) -> Result<ConnectionState, ClientError> {
        let target = ConnectTarget::from_url(url, user_id)?;
        self.connect(target).await
    }

    /// Stops the connection and cancels any pending reconnect. Resumable
    /// with [`connect`](Self::connect).
    pub async fn disconnect(&self) {
        if self
            .request(|reply| Command::Disconnect { reply })
            .await
            .is_err()
        {
            debug!("disconnect on a stopped client");
        }
    }

    /// Resets the reconnect counter and connects to the last target. This
    /// is the only way out of [`ConnectionState::Closed`].
    pub async fn reconnect(&self) -> Result<ConnectionState, ClientError> {
        self.request(|reply| Command::Reconnect { reply }).await?
    }

    /// Writes `raw` verbatim as a text frame.
    ///
    /// Returns `false`, with a logged warning, when not connected.
    pub async fn send(&self, raw: impl Into<String>) -> bool {
        let raw = raw.into();
        self.request(|reply| Command::Send { raw, reply })
            .await
            .unwrap_or(false)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch handle for rendering a status badge.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Current value of the reconnect counter.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Snapshot of the history, newest first.
    pub fn current_notifications(&self) -> Vec<Notification> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub async fn clear_notifications(&self) {
        let _ = self.request(|reply| Command::ClearHistory { reply }).await;
    }

    /// Subscribes to client events. Each subscriber gets every event sent
    /// after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events_tx.subscribe()
    }

    /// Stops the driver and waits for it to release the transport.
    pub async fn shutdown(&self) {
        let _ = self.request(|reply| Command::Shutdown { reply }).await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(DriverMsg::Command(make(tx)))
            .map_err(|_| ClientError::Shutdown)?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }
}

impl Drop for NotificationClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for NotificationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationClient")
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish()
    }
}
