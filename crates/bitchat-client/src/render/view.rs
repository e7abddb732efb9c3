//! Presentation-neutral projection of [`ClientState`].
//!
//! Both renderers draw from the same [`View`], so the placeholder and prefix
//! rules live here once. Text in a view is raw; escaping is the renderer's job.

use chrono::{DateTime, Local, TimeZone, Utc};

use bitchat_shared::constants::{APP_NAME, MAX_MESSAGE_CHARS, MESSAGE_CHARS_WARNING};
use bitchat_shared::types::{ConversationMode, Message};

use crate::state::ClientState;

pub const WELCOME_TITLE: &str = "Welcome to BitChat";
pub const WELCOME_TAGLINE: &str = "Decentralized • Encrypted • Peer-to-Peer";
pub const WELCOME_HINT: &str =
    "Start by connecting to the BLE mesh network or wait for peers to join.";
pub const NO_PEERS: &str = "No peers online";
pub const NO_CHANNELS: &str = "No channels discovered";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub header: Header,
    pub conversations: Vec<ConversationItem>,
    pub peers: ListSection<PeerItem>,
    pub channels: ListSection<ChannelItem>,
    pub messages: MessageSection,
    pub composer: Composer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub app: &'static str,
    pub status: &'static str,
    pub connected: bool,
    pub nickname: String,
    pub peer_count: u32,
    pub session_count: u32,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationItem {
    pub label: String,
    pub active: bool,
    pub protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSection<T> {
    Empty(&'static str),
    Items(Vec<T>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerItem {
    pub nickname: String,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelItem {
    pub name: String,
    pub joined: bool,
    pub protected: bool,
    pub has_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSection {
    Welcome,
    Items(Vec<MessageLine>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Public,
    Channel,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    pub prefix: String,
    pub time: String,
    pub content: String,
    pub own: bool,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    pub draft: String,
    pub chars: usize,
    pub limit: usize,
    pub warn: bool,
}

pub fn build(state: &ClientState) -> View {
    let user = state.user();
    let connection = state.connection();

    let header = Header {
        app: APP_NAME,
        status: connection.label(),
        connected: connection.is_connected(),
        nickname: user.nickname.clone(),
        peer_count: user.peer_count,
        session_count: user.session_count,
        mode: state.mode().display_name(),
    };

    let mut conversations = vec![ConversationItem {
        label: ConversationMode::Public.display_name(),
        active: *state.mode() == ConversationMode::Public,
        protected: false,
    }];
    conversations.extend(
        state
            .channels()
            .iter()
            .filter(|c| c.is_joined)
            .map(|c| ConversationItem {
                label: c.name.clone(),
                active: matches!(state.mode(), ConversationMode::Channel(name) if *name == c.name),
                protected: c.is_protected,
            }),
    );

    let peers = if state.peers().is_empty() {
        ListSection::Empty(NO_PEERS)
    } else {
        ListSection::Items(
            state
                .peers()
                .iter()
                .map(|p| PeerItem {
                    nickname: p.nickname.clone(),
                    secure: p.has_secure_session(),
                })
                .collect(),
        )
    };

    let channels = if state.channels().is_empty() {
        ListSection::Empty(NO_CHANNELS)
    } else {
        ListSection::Items(
            state
                .channels()
                .iter()
                .map(|c| ChannelItem {
                    name: c.name.clone(),
                    joined: c.is_joined,
                    protected: c.is_protected,
                    has_key: c.has_key,
                })
                .collect(),
        )
    };

    let messages = if state.history().is_empty() {
        MessageSection::Welcome
    } else {
        MessageSection::Items(state.history().iter().map(message_line).collect())
    };

    let chars = state.draft().chars().count();
    let composer = Composer {
        draft: state.draft().to_string(),
        chars,
        limit: MAX_MESSAGE_CHARS,
        warn: chars > MESSAGE_CHARS_WARNING,
    };

    View {
        header,
        conversations,
        peers,
        channels,
        messages,
        composer,
    }
}

fn message_line(msg: &Message) -> MessageLine {
    let kind = if msg.is_private {
        MessageKind::Private
    } else if msg.channel.is_some() {
        MessageKind::Channel
    } else {
        MessageKind::Public
    };
    MessageLine {
        prefix: message_prefix(msg),
        time: clock_time(msg.timestamp(), &Local),
        content: msg.content.clone(),
        own: msg.is_own,
        kind,
    }
}

/// `HH:MM:SS` wall-clock time of `at` in `tz`. Messages are shown in the
/// viewer's local zone.
pub fn clock_time<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format("%H:%M:%S").to_string()
}

/// Sender line of a message:
/// `alice`, `alice @ #general`, `→ bob` (sent) or `alice → you` (received).
pub fn message_prefix(msg: &Message) -> String {
    if msg.is_private {
        if msg.is_own {
            format!("→ {}", msg.recipient.as_deref().unwrap_or("unknown"))
        } else {
            format!("{} → you", msg.sender)
        }
    } else if let Some(channel) = &msg.channel {
        format!("{} @ {}", msg.sender, channel)
    } else {
        msg.sender.clone()
    }
}
