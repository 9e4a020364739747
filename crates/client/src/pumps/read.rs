//! WebSocket read pump: forwards inbound frames to the driver.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::driver::{DriverMsg, Inbox, TransportEvent};
use crate::error::TransportError;

/// Reads frames from the socket and hands text frames to the driver in
/// arrival order.
///
/// Parsing happens on the driver, so this loop never blocks on dispatch.
/// When the stream ends for any reason other than cancellation, a single
/// [`TransportEvent::Closed`] is reported for `epoch`.
pub(crate) async fn read_pump<S>(
    mut read: S,
    epoch: u64,
    inbox: Inbox,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let error = loop {
        tokio::select! {
            _ = cancel.cancelled() => return,

            msg = read.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let event = TransportEvent::Frame {
                            epoch,
                            text: text.as_str().to_owned(),
                        };
                        if inbox.send(DriverMsg::Event(event)).is_err() {
                            // Driver is gone.
                            return;
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(data))) => {
                        trace!("received ping, sending pong");
                        // Never wait on the writer here; a stalled socket must not
                        // hold up inbound frames.
                        if let Err(e) = write_tx.try_send(tungstenite::Message::Pong(data)) {
                            warn!(error = %e, "write queue unavailable, pong dropped");
                        }
                    }
                    Some(Ok(tungstenite::Message::Pong(_))) => {
                        trace!("received pong");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        debug!(?frame, "received close frame");
                        break None;
                    }
                    Some(Ok(_)) => {
                        trace!("ignoring binary frame");
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break Some(TransportError::Ws(e));
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break None;
                    }
                }
            }
        }
    };

    let _ = inbox.send(DriverMsg::Event(TransportEvent::Closed { epoch, error }));
}
