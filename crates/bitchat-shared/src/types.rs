use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Connection state of the backend as seen by this client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    /// Parse the status string carried by `connection_status` push events.
    /// Anything unrecognised counts as disconnected.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "connected" => Self::Connected,
            "connecting" => Self::Connecting,
            _ => Self::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Connecting => "Connecting...",
            Self::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Identity and counters of the local node, replaced wholesale on each
/// status poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub nickname: String,
    pub peer_id: String,
    pub peer_count: u32,
    pub session_count: u32,
}

impl Default for UserInfo {
    fn default() -> Self {
        Self {
            nickname: "Loading...".to_string(),
            peer_id: String::new(),
            peer_count: 0,
            session_count: 0,
        }
    }
}

/// Currently selected message-routing target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ConversationMode {
    #[default]
    Public,
    Channel(String),
    DirectMessage(String),
}

impl ConversationMode {
    /// The `type` string used by `/api/switch_mode` and `current_mode`.
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Public => ModeKind::Public,
            Self::Channel(_) => ModeKind::Channel,
            Self::DirectMessage(_) => ModeKind::Dm,
        }
    }

    /// The `target` sent to `/api/switch_mode`.
    pub fn target(&self) -> &str {
        match self {
            Self::Public => "",
            Self::Channel(name) => name,
            Self::DirectMessage(nick) => nick,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Public => "Public Chat".to_string(),
            Self::Channel(name) => name.clone(),
            Self::DirectMessage(nick) => format!("DM with {nick}"),
        }
    }
}

/// Discriminant of [`ConversationMode`] as it travels over the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Public,
    Channel,
    Dm,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Channel => "channel",
            Self::Dm => "dm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "channel" => Some(Self::Channel),
            "dm" => Some(Self::Dm),
            _ => None,
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message as delivered by `/api/messages` or a `new_message` push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    pub sender: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timestamp", deserialize_with = "deserialize_timestamp_ms")]
    pub timestamp_ms: i64,
    #[serde(default)]
    pub is_own: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_channel: bool,
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Message {
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_ms)
            .single()
            .unwrap_or_default()
    }
}

/// A peer visible on the mesh. A fingerprint means a secure session exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    #[serde(default)]
    pub id: Option<String>,
    pub nickname: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default = "default_true")]
    pub is_online: bool,
}

impl Peer {
    pub fn has_secure_session(&self) -> bool {
        self.fingerprint.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub is_joined: bool,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub has_key: bool,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub owner: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The backend stamps messages either with epoch millis or with an ISO-8601
/// string. Naive datetimes come from the backend's wall clock and are read in
/// the local zone.
fn deserialize_timestamp_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Float(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Ok(ms),
        Raw::Float(ms) => Ok(ms as i64),
        Raw::Text(s) => parse_timestamp(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognised timestamp: {s}"))
        }),
    }
}

pub fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}
