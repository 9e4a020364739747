//! The per-client driver task.
//!
//! One task owns the [`ConnectionMachine`], the live [`Connection`] and the
//! history writer. Host commands, transport results, inbound frames and
//! timer expiries all arrive on a single channel and are handled one at a
//! time, so state transitions, dispatch and sink callbacks are totally
//! ordered per client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use taskbell_protocol::ConnectTarget;

use crate::dispatch::{Dispatcher, EventSinks};
use crate::error::{ClientError, TransportError};
use crate::machine::{ConnectionMachine, Step};
use crate::reconnection::{cancel_slot, spawn_attempt, spawn_reconnect_timer};
use crate::transport::{Connection, Connector, TransportParts};
use crate::types::{ClientConfig, ConnectionState};

/// Sender side of the driver's channel.
pub(crate) type Inbox = mpsc::UnboundedSender<DriverMsg>;

/// Results reported by transport tasks and timers.
pub(crate) enum TransportEvent {
    Opened { epoch: u64, parts: TransportParts },
    Failed { epoch: u64, error: TransportError },
    Frame { epoch: u64, text: String },
    Closed { epoch: u64, error: Option<TransportError> },
    ReconnectDue { epoch: u64 },
}

/// Requests from the facade.
pub(crate) enum Command {
    Connect {
        target: ConnectTarget,
        reply: oneshot::Sender<ConnectionState>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Reconnect {
        reply: oneshot::Sender<Result<ConnectionState, ClientError>>,
    },
    Send {
        raw: String,
        reply: oneshot::Sender<bool>,
    },
    ClearHistory {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub(crate) enum DriverMsg {
    Command(Command),
    Event(TransportEvent),
}

pub(crate) struct Driver {
    machine: ConnectionMachine,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    target: Option<ConnectTarget>,
    connection: Option<Connection>,
    attempt_cancel: Option<CancellationToken>,
    reconnect_cancel: Option<CancellationToken>,
    dispatcher: Dispatcher,
    sinks: EventSinks,
    inbox: Inbox,
    state_tx: watch::Sender<ConnectionState>,
    attempts: Arc<AtomicU32>,
    published: ConnectionState,
    /// `on_disconnect` already fired since the last open or host connect.
    loss_reported: bool,
}

impl Driver {
    pub(crate) fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        dispatcher: Dispatcher,
        sinks: EventSinks,
        inbox: Inbox,
        state_tx: watch::Sender<ConnectionState>,
        attempts: Arc<AtomicU32>,
    ) -> Self {
        Self {
            machine: ConnectionMachine::new(config.max_reconnect_attempts),
            config,
            connector,
            target: None,
            connection: None,
            attempt_cancel: None,
            reconnect_cancel: None,
            dispatcher,
            sinks,
            inbox,
            state_tx,
            attempts,
            published: ConnectionState::Disconnected,
            loss_reported: false,
        }
    }

    /// Processes messages until shut down.
    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<DriverMsg>,
        shutdown: CancellationToken,
    ) {
        loop {
            let msg = tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => msg,
            };
            match msg {
                Some(DriverMsg::Command(Command::Shutdown { reply })) => {
                    self.teardown();
                    let _ = reply.send(());
                    return;
                }
                Some(DriverMsg::Command(cmd)) => self.handle_command(cmd),
                Some(DriverMsg::Event(ev)) => self.handle_event(ev),
                None => break,
            }
            self.publish();
        }
        self.teardown();
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { target, reply } => {
                match self.machine.begin_connect() {
                    Step::Noop => {
                        debug!(
                            state = self.machine.state().label(),
                            "connect ignored, already active"
                        );
                    }
                    step => {
                        self.target = Some(target);
                        self.loss_reported = false;
                        self.apply(step);
                    }
                }
                let _ = reply.send(self.machine.state());
            }
            Command::Disconnect { reply } => {
                let was_connected = self.machine.state().is_connected();
                self.drop_transport();
                self.machine.disconnect();
                info!("disconnected by host");
                self.publish();
                if was_connected {
                    self.report_disconnect();
                }
                let _ = reply.send(());
            }
            Command::Reconnect { reply } => {
                if self.target.is_none() {
                    let _ = reply.send(Err(ClientError::NoTarget));
                    return;
                }
                let was_connected = self.machine.state().is_connected();
                self.drop_transport();
                let step = self.machine.reset();
                info!("reconnect requested by host, counter reset");
                if was_connected {
                    self.report_disconnect();
                }
                self.loss_reported = false;
                self.apply(step);
                let _ = reply.send(Ok(self.machine.state()));
            }
            Command::Send { raw, reply } => {
                let sent = match &self.connection {
                    Some(conn) if self.machine.state().is_connected() => {
                        match conn.send_text(raw) {
                            Ok(()) => true,
                            Err(e) => {
                                warn!(error = %e, "failed to queue outbound message");
                                false
                            }
                        }
                    }
                    _ => {
                        warn!(
                            state = self.machine.state().label(),
                            "not connected, dropping outbound message"
                        );
                        false
                    }
                };
                let _ = reply.send(sent);
            }
            Command::ClearHistory { reply } => {
                self.dispatcher.clear();
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                // Handled in `run`; kept for exhaustiveness.
                self.teardown();
                let _ = reply.send(());
            }
        }
    }

    fn handle_event(&mut self, ev: TransportEvent) {
        match ev {
            TransportEvent::Opened { epoch, parts } => {
                if !self.machine.on_open(epoch) {
                    debug!(epoch, "discarding stale transport");
                    return;
                }
                self.attempt_cancel = None;
                self.loss_reported = false;
                self.connection = Some(Connection::start(
                    parts,
                    epoch,
                    self.inbox.clone(),
                    self.config.ping_interval,
                ));
                info!(
                    url = %self.target.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "connected"
                );
                self.publish();
                self.sinks.connected();
            }
            TransportEvent::Failed { epoch, error } => {
                if !self.machine.is_current(epoch) {
                    trace!(epoch, "ignoring stale connect failure");
                    return;
                }
                warn!(epoch, error = %error, "connect attempt failed");
                self.attempt_cancel = None;
                self.sinks.error(&error);
                let step = self.machine.on_lost(epoch);
                self.apply(step);
            }
            TransportEvent::Closed { epoch, error } => {
                let ours = self.connection.as_ref().is_some_and(|c| c.epoch() == epoch);
                if !ours || !self.machine.is_current(epoch) {
                    trace!(epoch, "ignoring close of stale connection");
                    return;
                }
                self.connection = None;
                match &error {
                    Some(e) => {
                        warn!(error = %e, "connection lost");
                        self.sinks.error(e);
                    }
                    None => info!("connection closed by server"),
                }
                self.report_disconnect();
                let step = self.machine.on_lost(epoch);
                self.apply(step);
            }
            TransportEvent::Frame { epoch, text } => {
                if self.machine.is_current(epoch) && self.machine.state().is_connected() {
                    self.dispatcher.dispatch(&text, &self.sinks);
                } else {
                    trace!(epoch, "dropping frame from stale connection");
                }
            }
            TransportEvent::ReconnectDue { epoch } => match self.machine.on_reconnect_due(epoch) {
                Step::Noop => debug!(epoch, "ignoring stale reconnect timer"),
                step => {
                    self.reconnect_cancel = None;
                    self.apply(step);
                }
            },
        }
    }

    fn apply(&mut self, step: Step) {
        match step {
            Step::Noop => {}
            Step::StartAttempt { epoch } => self.start_attempt(epoch),
            Step::ScheduleReconnect { epoch, attempt } => {
                let delay = self.config.reconnect_interval;
                let token = CancellationToken::new();
                cancel_slot(&mut self.reconnect_cancel);
                self.reconnect_cancel = Some(token.clone());
                info!(
                    attempt,
                    max = self.machine.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "reconnecting"
                );
                spawn_reconnect_timer(epoch, delay, self.inbox.clone(), token);
                self.publish();
                self.sinks.reconnecting(attempt, delay);
            }
            Step::GiveUp => {
                warn!(
                    max = self.machine.max_attempts(),
                    "reconnect budget exhausted, giving up"
                );
                self.drop_transport();
                self.publish();
                // Budget can run out on a failed attempt, which has not
                // reported the loss yet.
                self.report_disconnect();
            }
        }
    }

    fn start_attempt(&mut self, epoch: u64) {
        self.drop_transport();
        let Some(target) = &self.target else {
            warn!("no connect target, staying disconnected");
            self.machine.disconnect();
            return;
        };
        let token = CancellationToken::new();
        self.attempt_cancel = Some(token.clone());
        info!(url = %target, epoch, "connecting");
        spawn_attempt(
            self.connector.clone(),
            target.url().to_string(),
            epoch,
            self.inbox.clone(),
            token,
        );
        self.publish();
    }

    /// Cancels the pending reconnect and any in-flight attempt, and closes
    /// the live connection.
    fn drop_transport(&mut self) {
        cancel_slot(&mut self.reconnect_cancel);
        cancel_slot(&mut self.attempt_cancel);
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
    }

    /// Fires `on_disconnect` at most once per loss.
    fn report_disconnect(&mut self) {
        if self.loss_reported {
            return;
        }
        self.loss_reported = true;
        self.sinks.disconnected();
    }

    fn teardown(&mut self) {
        self.drop_transport();
        if self.machine.state() != ConnectionState::Disconnected {
            self.machine.disconnect();
        }
        self.publish();
        debug!("driver stopped");
    }

    /// Pushes the machine's state to watchers and sinks if it changed.
    fn publish(&mut self) {
        self.attempts.store(self.machine.attempts(), Ordering::Relaxed);
        let state = self.machine.state();
        if state == self.published {
            return;
        }
        debug!(from = self.published.label(), to = state.label(), "state changed");
        self.published = state;
        self.state_tx.send_replace(state);
        self.sinks.state(state);
    }
}
