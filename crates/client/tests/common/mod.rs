//! In-memory transport for driving the client without a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

use taskbell_client::{
    ClientConfig, ClientEvent, ConnectionState, Connector, NotificationClient, TransportError,
    TransportParts,
};

/// Outcome of one scripted connect attempt.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    Refuse,
}

/// Server side of an accepted in-memory connection.
pub struct ServerEnd {
    to_client: mpsc::UnboundedSender<Result<tungstenite::Message, tungstenite::Error>>,
    from_client: mpsc::UnboundedReceiver<tungstenite::Message>,
}

impl ServerEnd {
    pub fn push(&self, text: &str) {
        let _ = self
            .to_client
            .send(Ok(tungstenite::Message::Text(text.to_string().into())));
    }

    /// Next text frame written by the client.
    pub async fn next_text(&mut self) -> String {
        loop {
            match self.from_client.recv().await {
                Some(tungstenite::Message::Text(t)) => return t.as_str().to_owned(),
                Some(_) => continue,
                None => panic!("client hung up"),
            }
        }
    }

    pub fn try_next(&mut self) -> Option<tungstenite::Message> {
        self.from_client.try_recv().ok()
    }

    /// Simulates the server dropping the socket.
    pub fn hang_up(self) {
        drop(self);
    }
}

/// Connector that follows a script of outcomes; refuses once it runs out.
pub struct MockConnector {
    plan: Mutex<VecDeque<Outcome>>,
    attempts: AtomicUsize,
    urls: Mutex<Vec<String>>,
    accepted_tx: mpsc::UnboundedSender<ServerEnd>,
}

impl MockConnector {
    pub fn new(
        plan: impl IntoIterator<Item = Outcome>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            plan: Mutex::new(plan.into_iter().collect()),
            attempts: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            accepted_tx,
        });
        (connector, accepted_rx)
    }

    pub fn push_plan(&self, outcome: Outcome) {
        self.plan.lock().unwrap().push_back(outcome);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<TransportParts, TransportError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        let outcome = self
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Refuse);

        match outcome {
            Outcome::Refuse => {
                Box::pin(async { Err(TransportError::Connect("connection refused".into())) })
            }
            Outcome::Accept => {
                let (to_client, mut inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let stream = stream::poll_fn(move |cx| inbound.poll_recv(cx));
                let sink = sink::unfold(outbound, |tx, msg: tungstenite::Message| async move {
                    let _ = tx.send(msg);
                    Ok::<_, tungstenite::Error>(tx)
                });
                let _ = self.accepted_tx.send(ServerEnd {
                    to_client,
                    from_client,
                });
                Box::pin(async move {
                    Ok(TransportParts {
                        sink: Box::pin(sink),
                        stream: Box::pin(stream),
                    })
                })
            }
        }
    }
}

pub const URL: &str = "ws://tasks.test/ws/42";

pub fn config(max_attempts: u32) -> ClientConfig {
    ClientConfig {
        reconnect_interval: Duration::from_millis(3000),
        max_reconnect_attempts: max_attempts,
        ..ClientConfig::default()
    }
}

/// Waits (in virtual time) until the client reaches a matching state.
pub async fn wait_state(
    client: &NotificationClient,
    pred: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut rx = client.watch_state();
    let state = tokio::time::timeout(Duration::from_secs(120), rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("client dropped");
    *state
}

/// Receives the next notification event, skipping others.
pub async fn next_notification(
    events: &mut tokio::sync::broadcast::Receiver<ClientEvent>,
) -> taskbell_protocol::Notification {
    loop {
        let ev = tokio::time::timeout(Duration::from_secs(120), events.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("event channel closed");
        if let ClientEvent::Notification(n) = ev {
            return n;
        }
    }
}

/// Drains the state transitions seen so far.
pub fn drain_states(
    events: &mut tokio::sync::broadcast::Receiver<ClientEvent>,
) -> Vec<ConnectionState> {
    let mut out = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if let ClientEvent::StateChanged(s) = ev {
            out.push(s);
        }
    }
    out
}
