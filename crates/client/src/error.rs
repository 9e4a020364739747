//! Error types for the notification client.

use taskbell_protocol::ConfigError;
use tokio_tungstenite::tungstenite;

/// Failures of the underlying transport.
///
/// Recovered by the reconnect policy; hosts only see them through
/// `on_error` and the event stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connection closed")]
    Closed,
}

/// Errors returned to the host by [`NotificationClient`](crate::NotificationClient).
///
/// Transport failures are not here: they drive the reconnect policy and
/// reach the host only through the sinks.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid connect target: {0}")]
    Config(#[from] ConfigError),

    #[error("no connect target; call connect first")]
    NoTarget,

    #[error("client has been shut down")]
    Shutdown,
}
