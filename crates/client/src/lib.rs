//! Real-time notification client.
//!
//! Keeps one WebSocket connection to the task server, reconnects with a
//! fixed delay up to a bounded budget, parses push frames into
//! [`Notification`](taskbell_protocol::Notification)s, keeps a bounded
//! newest-first history and fans events out to host sinks.

pub mod client;
mod dispatch;
mod driver;
pub mod error;
pub mod history;
pub mod machine;
mod pumps;
pub(crate) mod reconnection;
pub mod transport;
pub mod types;

pub use client::NotificationClient;
pub use error::{ClientError, TransportError};
pub use history::NotificationHistory;
pub use machine::{ConnectionMachine, Step};
pub use transport::{Connector, FrameSink, FrameStream, TransportParts, WsConnector};
pub use types::{ClientConfig, ClientEvent, ClientHandlers, ConnectionState};
