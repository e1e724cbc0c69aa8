//! Realtime channel: event types, the channel trait and its Socket.IO
//! implementation.

mod codec;
mod socket;

pub use codec::{engine_url, Packet};
pub use socket::SocketIoChannel;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    error::Result,
    models::{IncomingMessage, OutgoingMessage, UserId},
};

/// Default realtime socket URL.
pub const DEFAULT_SOCKET_URL: &str = "http://localhost:5000";

/// Realtime channel configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Socket server URL (`http(s)://` or `ws(s)://`).
    pub socket_url: String,
    /// Token sent with the namespace connect packet.
    pub token: Option<String>,
    /// Capacity of the inbound event queue.
    pub event_buffer: usize,
    /// How long `close` lets queued frames flush before dropping them.
    pub close_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            socket_url: DEFAULT_SOCKET_URL.to_owned(),
            token: None,
            event_buffer: 256,
            close_timeout: Duration::from_secs(2),
        }
    }
}

/// Connection state of a realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Connection attempt or live connection failed.
    Failed(String),
}

impl ConnectionState {
    /// Whether commands can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Everything the channel can deliver to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `receiveMessage`: a new message, including echoes of our own sends.
    MessageReceived(IncomingMessage),
    /// `unreadConversationUpdate`: unread state changed somewhere.
    UnreadChanged,
    /// Transport state transition.
    ConnectionStateChanged(ConnectionState),
}

/// Commands sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
    /// `identifyAdmin`: announce the admin identity after connecting.
    IdentifyAdmin(UserId),
    /// `sendMessage`: deliver a chat message.
    SendMessage(OutgoingMessage),
}

impl OutboundCommand {
    /// Event name on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundCommand::IdentifyAdmin(_) => "identifyAdmin",
            OutboundCommand::SendMessage(_) => "sendMessage",
        }
    }

    /// Event payload on the wire.
    pub fn payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            OutboundCommand::IdentifyAdmin(id) => serde_json::to_value(id)?,
            OutboundCommand::SendMessage(msg) => serde_json::to_value(msg)?,
        };
        Ok(value)
    }
}

/// A bidirectional realtime event stream.
///
/// Implementations own the underlying connection. `close` must be safe to
/// call at any time, including when nothing is connected.
#[async_trait]
pub trait RealtimeChannel: Send {
    /// Open the connection. Inbound events, including connection state
    /// changes, are delivered in order on the returned receiver.
    async fn connect(&mut self) -> Result<mpsc::Receiver<InboundEvent>>;

    /// Send a command without waiting for acknowledgement.
    async fn emit(&mut self, command: OutboundCommand) -> Result<()>;

    /// Release the connection and stop delivering events.
    async fn close(&mut self);
}
