//! Socket.IO channel over a WebSocket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use super::codec::{decode, encode, engine_url, Packet};
use super::{ConnectionState, InboundEvent, OutboundCommand, RealtimeChannel, RealtimeConfig};
use crate::error::{Error, Result};
use crate::models::IncomingMessage;

/// Realtime channel speaking Socket.IO v4 over a WebSocket transport.
///
/// Owns two background tasks per connection: a reader that decodes frames
/// and forwards events, and a writer that drains the outbound queue. Both are
/// stopped by [`RealtimeChannel::close`] or on drop.
pub struct SocketIoChannel {
    config: RealtimeConfig,
    outbound: Option<mpsc::UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SocketIoChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketIoChannel")
            .field("socket_url", &self.config.socket_url)
            .field("connected", &self.outbound.is_some())
            .finish()
    }
}

impl SocketIoChannel {
    /// Create an unconnected channel.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            config,
            outbound: None,
            reader: None,
            writer: None,
        }
    }

    fn connect_payload(&self) -> Option<Value> {
        self.config.token.as_ref().map(|t| json!({ "token": t }))
    }
}

#[async_trait]
impl RealtimeChannel for SocketIoChannel {
    async fn connect(&mut self) -> Result<mpsc::Receiver<InboundEvent>> {
        if self.outbound.is_some() {
            self.close().await;
        }

        let url = engine_url(&self.config.socket_url)?;
        log::info!("connecting realtime channel to {}", url);
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Realtime(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer.max(1));

        let writer = tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    log::warn!("realtime send failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let state = Reader {
            auth: self.connect_payload(),
            replies: out_tx.clone(),
            events: event_tx,
        };
        let reader = tokio::spawn(async move {
            let final_state = state.run(&mut stream).await;
            let _ = state
                .events
                .send(InboundEvent::ConnectionStateChanged(final_state))
                .await;
        });

        self.outbound = Some(out_tx);
        self.reader = Some(reader);
        self.writer = Some(writer);
        Ok(event_rx)
    }

    async fn emit(&mut self, command: OutboundCommand) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| Error::Realtime("not connected".into()))?;
        let packet = Packet::event(command.event_name(), command.payload()?);
        log::debug!("emit {}", command.event_name());
        outbound
            .send(encode(&packet))
            .map_err(|_| Error::Realtime("connection closed".into()))
    }

    async fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(outbound) = self.outbound.take() {
            // Dropping the sender lets the writer flush this and exit.
            let _ = outbound.send(encode(&Packet::Disconnect));
        }
        if let Some(writer) = self.writer.take() {
            stop_writer(writer, self.config.close_timeout).await;
        }
    }
}

/// Wait for the writer to flush, aborting it if the peer stops reading.
async fn stop_writer(writer: JoinHandle<()>, grace: Duration) {
    let abort = writer.abort_handle();
    if tokio::time::timeout(grace, writer).await.is_err() {
        log::warn!("realtime writer still busy after {:?}, aborting", grace);
        abort.abort();
    }
}

impl Drop for SocketIoChannel {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

/// Per-connection reader state.
struct Reader {
    auth: Option<Value>,
    replies: mpsc::UnboundedSender<String>,
    events: mpsc::Sender<InboundEvent>,
}

impl Reader {
    async fn run<S>(&self, stream: &mut S) -> ConnectionState
    where
        S: futures::Stream<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) => return ConnectionState::Disconnected,
                Ok(_) => continue,
                Err(e) => return ConnectionState::Failed(e.to_string()),
            };

            let packet = match decode(&text) {
                Ok(packet) => packet,
                Err(e) => {
                    log::warn!("dropping realtime frame: {}", e);
                    continue;
                }
            };

            let step = translate(packet, self.auth.as_ref());
            if let Some(reply) = step.reply {
                if self.replies.send(encode(&reply)).is_err() {
                    return ConnectionState::Disconnected;
                }
            }
            if let Some(event) = step.event {
                if self.events.send(event).await.is_err() {
                    // Consumer went away.
                    return ConnectionState::Disconnected;
                }
            }
            if let Some(state) = step.stop {
                return state;
            }
        }
        ConnectionState::Disconnected
    }
}

/// What to do in response to one packet.
#[derive(Debug, Default, PartialEq)]
struct Step {
    reply: Option<Packet>,
    event: Option<InboundEvent>,
    stop: Option<ConnectionState>,
}

fn translate(packet: Packet, auth: Option<&Value>) -> Step {
    match packet {
        Packet::Open(_) => Step {
            reply: Some(Packet::Connect(auth.cloned())),
            ..Default::default()
        },
        Packet::Ping => Step {
            reply: Some(Packet::Pong),
            ..Default::default()
        },
        Packet::Connect(_) => Step {
            event: Some(InboundEvent::ConnectionStateChanged(ConnectionState::Connected)),
            ..Default::default()
        },
        Packet::Event { name, args } => Step {
            event: translate_event(&name, args),
            ..Default::default()
        },
        Packet::ConnectError(reason) => {
            let reason = reason
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_owned)
                .unwrap_or_else(|| reason.to_string());
            Step {
                stop: Some(ConnectionState::Failed(reason)),
                ..Default::default()
            }
        }
        Packet::Disconnect | Packet::Close => Step {
            stop: Some(ConnectionState::Disconnected),
            ..Default::default()
        },
        Packet::Pong | Packet::Noop => Step::default(),
    }
}

fn translate_event(name: &str, mut args: Vec<Value>) -> Option<InboundEvent> {
    match name {
        "receiveMessage" => {
            if args.is_empty() {
                log::warn!("receiveMessage without payload");
                return None;
            }
            match serde_json::from_value::<IncomingMessage>(args.swap_remove(0)) {
                Ok(msg) => Some(InboundEvent::MessageReceived(msg)),
                Err(e) => {
                    log::warn!("malformed receiveMessage payload: {}", e);
                    None
                }
            }
        }
        "unreadConversationUpdate" => Some(InboundEvent::UnreadChanged),
        other => {
            log::debug!("ignoring realtime event {}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handshake_sends_auth() {
        let auth = json!({"token": "t"});
        let step = translate(Packet::Open(json!({"sid": "s"})), Some(&auth));
        assert_eq!(step.reply, Some(Packet::Connect(Some(auth))));
        assert_eq!(step.event, None);
    }

    #[test]
    fn test_ping_is_answered() {
        let step = translate(Packet::Ping, None);
        assert_eq!(step.reply, Some(Packet::Pong));
    }

    #[test]
    fn test_connect_ack_reports_connected() {
        let step = translate(Packet::Connect(Some(json!({"sid": "x"}))), None);
        assert_eq!(
            step.event,
            Some(InboundEvent::ConnectionStateChanged(ConnectionState::Connected))
        );
    }

    #[test]
    fn test_receive_message_event() {
        let step = translate(
            Packet::event(
                "receiveMessage",
                json!({"id": 5, "user_id": 7, "sender_role": "user", "message_text": "hi"}),
            ),
            None,
        );
        match step.event {
            Some(InboundEvent::MessageReceived(msg)) => {
                assert_eq!(msg.user_id, UserId::from(7));
                assert_eq!(msg.message_text, "hi");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_malformed_events_are_dropped() {
        assert_eq!(translate(Packet::event("newRechargeRequest", json!({})), None), Step::default());
        assert_eq!(translate(Packet::event("receiveMessage", json!("oops")), None), Step::default());
    }

    #[test]
    fn test_unread_update_is_a_signal() {
        let step = translate(
            Packet::Event {
                name: "unreadConversationUpdate".into(),
                args: vec![json!({"userId": 7})],
            },
            None,
        );
        assert_eq!(step.event, Some(InboundEvent::UnreadChanged));
    }

    #[test]
    fn test_connect_error_stops_with_reason() {
        let step = translate(Packet::ConnectError(json!({"message": "bad token"})), None);
        assert_eq!(step.stop, Some(ConnectionState::Failed("bad token".into())));
    }

    #[tokio::test]
    async fn test_emit_without_connection_fails() {
        let mut channel = SocketIoChannel::new(RealtimeConfig::default());
        let err = channel
            .emit(OutboundCommand::IdentifyAdmin(UserId::from(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Realtime(_)));

        // Closing an unconnected channel is a no-op, twice.
        channel.close().await;
        channel.close().await;
    }

    #[tokio::test]
    async fn test_stop_writer_lets_a_flushing_writer_finish() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let writer = tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = done_tx.send(());
        });

        stop_writer(writer, Duration::from_secs(1)).await;
        assert!(done_rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_close_aborts_a_stuck_writer() {
        let mut channel = SocketIoChannel::new(RealtimeConfig {
            close_timeout: Duration::from_millis(50),
            ..Default::default()
        });
        // A writer parked on a peer that never reads.
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        channel.outbound = Some(out_tx);
        channel.writer = Some(tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await;
        }));

        let closed = tokio::time::timeout(Duration::from_secs(2), channel.close()).await;
        assert!(closed.is_ok());
        // The aborted task dropped its end.
        assert!(alive_rx.await.is_err());
        assert!(channel.writer.is_none());
    }
}
