//! Outbound half of a live connection.
//!
//! Host `send()` frames, pong replies and keep-alive pings all funnel
//! through one queue so the socket has a single writer.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reason sent with the close frame when the client lets go of a socket.
const CLOSE_REASON: &str = "client disconnect";

/// Writes queued frames until the connection is cancelled or every sender
/// is gone, then closes the socket with a normal close frame.
///
/// A failed write ends the pump without a close frame; the read side
/// reports the loss.
pub(crate) async fn write_pump<S>(
    mut socket: S,
    mut queue: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut written = 0usize;
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = queue.recv() => frame,
        };
        let Some(frame) = frame else { break };
        if let Err(e) = socket.send(frame).await {
            warn!(error = %e, written, "socket write failed");
            return;
        }
        written += 1;
    }

    debug!(written, "closing socket");
    let close = CloseFrame {
        code: CloseCode::Normal,
        reason: CLOSE_REASON.into(),
    };
    let _ = socket.send(tungstenite::Message::Close(Some(close))).await;
}
