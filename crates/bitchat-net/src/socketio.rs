//! Engine.IO v4 / Socket.IO v5 framing for the push channel.
//!
//! Only the WebSocket transport and the default namespace are spoken. Every
//! WebSocket text frame carries exactly one Engine.IO packet, and Socket.IO
//! packets ride inside Engine.IO `message` packets (`4` + packet), so a
//! server event arrives as `42["name",{...}]`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use bitchat_shared::ClientError;

/// Join the default namespace.
pub const CONNECT: &str = "40";
/// Leave the default namespace.
pub const DISCONNECT: &str = "41";
/// Answer to a server ping.
pub const PONG: &str = "3";

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: u64,
}

impl Handshake {
    /// How long the server may stay silent before the connection counts as
    /// dead.
    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(Packet),
    Upgrade,
    Noop,
}

/// One Socket.IO packet, as seen from the default namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// The namespace join was accepted.
    Connect,
    /// The server removed us from the namespace.
    Disconnect,
    Event { name: String, data: Value },
    /// The server refused the namespace join.
    ConnectError(String),
    /// Acks, binary attachments and traffic for other namespaces.
    Ignored,
}

fn protocol(msg: impl Into<String>) -> ClientError {
    ClientError::Protocol(msg.into())
}

pub fn parse_frame(text: &str) -> Result<Frame, ClientError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| protocol("empty frame"))?;
    let body = chars.as_str();

    match kind {
        '0' => serde_json::from_str(body)
            .map(Frame::Open)
            .map_err(|e| protocol(format!("bad open packet: {e}"))),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => parse_packet(body).map(Frame::Message),
        '5' => Ok(Frame::Upgrade),
        '6' => Ok(Frame::Noop),
        other => Err(protocol(format!("unknown engine.io packet type {other:?}"))),
    }
}

fn parse_packet(text: &str) -> Result<Packet, ClientError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| protocol("empty message packet"))?;
    let rest = chars.as_str();

    // `/nsp,` prefix; `/` alone is the default namespace.
    let (namespace, rest) = match rest.strip_prefix('/') {
        Some(after) => after.split_once(',').unwrap_or((after, "")),
        None => ("", rest),
    };
    if !namespace.is_empty() {
        return Ok(Packet::Ignored);
    }

    // Optional ack id before the JSON payload.
    let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => parse_event(payload),
        '4' => Ok(Packet::ConnectError(connect_error_reason(payload))),
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(protocol(format!("unknown socket.io packet type {other:?}"))),
    }
}

fn parse_event(payload: &str) -> Result<Packet, ClientError> {
    let args: Vec<Value> = serde_json::from_str(payload)
        .map_err(|e| protocol(format!("bad event payload: {e}")))?;
    let mut args = args.into_iter();

    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(protocol("event without a name")),
    };
    Ok(Packet::Event {
        name,
        data: args.next().unwrap_or(Value::Null),
    })
}

fn connect_error_reason(payload: &str) -> String {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(payload)
            .to_string(),
        Ok(Value::String(reason)) => reason,
        _ => payload.to_string(),
    }
}
