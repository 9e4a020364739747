//! Optional application-level keep-alive.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use taskbell_protocol::constants::HEARTBEAT_TYPE;

/// Sends `{"type":"ping"}` every `period`. The server answers with
/// `{"type":"pong"}`, which the dispatch loop drops.
pub(crate) async fn ping_pump(
    write_tx: mpsc::Sender<tungstenite::Message>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // Skip immediate first tick.
    let frame = format!(r#"{{"type":"{HEARTBEAT_TYPE}"}}"#);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let ping = tungstenite::Message::Text(frame.clone().into());
                if write_tx.send(ping).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sends_text_ping_each_period() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ping_pump(tx, Duration::from_secs(10), cancel.clone()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first, tungstenite::Message::Text(r#"{"type":"ping"}"#.into()));
        let _second = rx.recv().await.unwrap();

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn ping_pump_stops_on_cancel() {
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let c = cancel.clone();
        let handle = tokio::spawn(async move {
            ping_pump(tx, Duration::from_secs(5), c).await;
        });

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("should stop")
            .expect("no panic");
    }
}
