//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only the subset used by the chat backend is supported: handshake,
//! heartbeat, namespace connect/disconnect and plain events on the default
//! namespace.

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0{...}`: Engine.IO handshake.
    Open(Value),
    /// `1`
    Close,
    /// `2`: server heartbeat.
    Ping,
    /// `3`
    Pong,
    /// `6`
    Noop,
    /// `40` / `40{...}`: namespace connect (client auth or server ack).
    Connect(Option<Value>),
    /// `41`
    Disconnect,
    /// `42[name, ...args]`
    Event { name: String, args: Vec<Value> },
    /// `44{...}`
    ConnectError(Value),
}

impl Packet {
    /// Build an event packet with a single argument.
    pub fn event(name: impl Into<String>, arg: Value) -> Self {
        Packet::Event {
            name: name.into(),
            args: vec![arg],
        }
    }
}

/// Encode a packet as a text frame.
pub fn encode(packet: &Packet) -> String {
    match packet {
        Packet::Open(v) => format!("0{}", v),
        Packet::Close => "1".to_owned(),
        Packet::Ping => "2".to_owned(),
        Packet::Pong => "3".to_owned(),
        Packet::Noop => "6".to_owned(),
        Packet::Connect(None) => "40".to_owned(),
        Packet::Connect(Some(v)) => format!("40{}", v),
        Packet::Disconnect => "41".to_owned(),
        Packet::Event { name, args } => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(name.clone()));
            items.extend(args.iter().cloned());
            format!("42{}", Value::Array(items))
        }
        Packet::ConnectError(v) => format!("44{}", v),
    }
}

/// Decode a text frame.
pub fn decode(text: &str) -> Result<Packet> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| Error::Realtime("empty frame".into()))?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Packet::Open(parse_json(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest),
        '6' => Ok(Packet::Noop),
        other => Err(Error::Realtime(format!(
            "unsupported engine packet type '{}'",
            other
        ))),
    }
}

fn decode_socket(text: &str) -> Result<Packet> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Realtime("empty socket packet".into()))?;
    let body = strip_ack_id(strip_namespace(chars.as_str()));

    match kind {
        '0' if body.is_empty() => Ok(Packet::Connect(None)),
        '0' => Ok(Packet::Connect(Some(parse_json(body)?))),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(body),
        '4' => Ok(Packet::ConnectError(parse_json(body)?)),
        other => Err(Error::Realtime(format!(
            "unsupported socket packet type '{}'",
            other
        ))),
    }
}

fn decode_event(body: &str) -> Result<Packet> {
    let mut items = match parse_json(body)? {
        Value::Array(items) => items,
        _ => return Err(Error::Realtime("event payload is not an array".into())),
    };
    if items.is_empty() {
        return Err(Error::Realtime("event without a name".into()));
    }
    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return Err(Error::Realtime("event name is not a string".into())),
    };
    Ok(Packet::Event { name, args: items })
}

/// `/admin,42[...]` carries a namespace before the comma.
fn strip_namespace(text: &str) -> &str {
    if text.starts_with('/') {
        text.split_once(',').map(|(_, rest)| rest).unwrap_or("")
    } else {
        text
    }
}

fn strip_ack_id(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| Error::Realtime(format!("bad packet payload: {}", e)))
}

/// WebSocket endpoint for a socket server URL.
///
/// `http://host:5000` becomes `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
pub fn engine_url(socket_url: &str) -> Result<Url> {
    let mut url = Url::parse(socket_url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::InvalidArgument(format!(
                "unsupported socket scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::InvalidArgument(format!("cannot use scheme {}", scheme)))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/socket.io/");
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}
