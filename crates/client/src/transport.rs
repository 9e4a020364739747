//! WebSocket transport.
//!
//! [`Connector`] is the seam between the client and the network: the
//! production [`WsConnector`] uses tokio-tungstenite, tests plug in an
//! in-memory pair of channels. A live [`Connection`] owns the read, write
//! and optional ping pumps for one socket.

use std::pin::Pin;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use taskbell_protocol::constants::MAX_FRAME_SIZE;

use crate::driver::Inbox;
use crate::error::TransportError;

/// Inbound half of an open transport.
pub type FrameStream =
    Pin<Box<dyn Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Send>>;

/// Outbound half of an open transport.
pub type FrameSink = Pin<Box<dyn Sink<tungstenite::Message, Error = tungstenite::Error> + Send>>;

/// Both halves of a freshly opened transport.
pub struct TransportParts {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl std::fmt::Debug for TransportParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransportParts")
    }
}

/// Opens transports. Implementations must be cheap to call repeatedly;
/// the client calls `connect` once per attempt.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<TransportParts, TransportError>>;
}

/// tokio-tungstenite backed connector.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<TransportParts, TransportError>> {
        let url = url.to_string();
        Box::pin(async move {
            let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
            ws_config.max_message_size = Some(MAX_FRAME_SIZE);
            ws_config.max_frame_size = Some(MAX_FRAME_SIZE);
            let (ws_stream, _) =
                tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
            let (write, read) = ws_stream.split();
            Ok(TransportParts {
                sink: Box::pin(write),
                stream: Box::pin(read),
            })
        })
    }
}

/// One live socket and its pumps.
///
/// Dropping the connection stops all pumps; [`close`](Self::close) also
/// sends a close frame first.
pub(crate) struct Connection {
    epoch: u64,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
    read_handle: tokio::task::JoinHandle<()>,
    /// Not aborted on drop: the pump exits on cancel after flushing a
    /// close frame.
    _write_handle: tokio::task::JoinHandle<()>,
    ping_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    /// Starts the pumps on an opened transport. Inbound frames and the
    /// final close are reported to `inbox` tagged with `epoch`.
    pub(crate) fn start(
        parts: TransportParts,
        epoch: u64,
        inbox: Inbox,
        ping_interval: Option<Duration>,
    ) -> Self {
        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
        let cancel = CancellationToken::new();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(parts.sink, write_rx, cancel))
        };

        let read_handle = {
            let cancel = cancel.clone();
            let write_tx = write_tx.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                parts.stream,
                epoch,
                inbox,
                write_tx,
                cancel,
            ))
        };

        let ping_handle = ping_interval.map(|period| {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::ping::ping_pump(write_tx, period, cancel))
        });

        Self {
            epoch,
            write_tx,
            cancel,
            read_handle,
            _write_handle: write_handle,
            ping_handle,
        }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Queues a raw text frame without waiting.
    pub(crate) fn send_text(&self, raw: String) -> Result<(), TransportError> {
        self.write_tx
            .try_send(tungstenite::Message::Text(raw.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Stops the pumps; the write pump sends a close frame on its way out.
    pub(crate) fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        if let Some(h) = &self.ping_handle {
            h.abort();
        }
    }
}
