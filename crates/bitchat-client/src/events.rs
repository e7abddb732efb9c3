use std::fmt;

use serde_json::Value;

use bitchat_net::ApiCall;
use bitchat_shared::types::{ConnectionStatus, Message};
use bitchat_shared::ClientError;

use crate::commands::CommandKind;
use crate::input::Intent;

/// Everything the event loop reacts to. Each event is handled to completion
/// before the next one is taken off the queue.
#[derive(Debug)]
pub enum AppEvent {
    /// Something the user asked for.
    Intent(Intent),
    /// Periodic refresh of status, peers and channels.
    PollTick,
    /// One-off refresh scheduled after a command succeeded.
    Refresh(Resource),
    /// `connection_status` push event.
    ConnectionStatus(ConnectionStatus),
    /// `new_message` push event.
    NewMessage(Message),
    PushConnected,
    PushDisconnected,
    /// Completion of a request issued with sequence number `seq`.
    Response {
        seq: u64,
        origin: Origin,
        result: Result<Value, ClientError>,
    },
    Shutdown,
}

/// Backend collections the client reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Status,
    Peers,
    Channels,
    Messages,
}

impl Resource {
    pub fn call(&self) -> ApiCall {
        match self {
            Self::Status => ApiCall::GetStatus,
            Self::Peers => ApiCall::GetPeers,
            Self::Channels => ApiCall::GetChannels,
            Self::Messages => ApiCall::GetMessages,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Status => "status",
            Self::Peers => "peers",
            Self::Channels => "channels",
            Self::Messages => "messages",
        };
        f.write_str(s)
    }
}

/// What a request was issued for, carried back with its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Read(Resource),
    Command(CommandKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Transient user-facing feedback (toast/banner equivalent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }

    /// Notice for a failed user action. Validation problems are warnings,
    /// everything else is an error.
    pub fn for_failure(action: &str, err: &ClientError) -> Self {
        match err {
            ClientError::Validation(v) => Self::warning(v.to_string()),
            ClientError::Network(_) => Self::error(err.to_string()),
            ClientError::Api { .. } | ClientError::Protocol(_) => {
                Self::error(format!("Failed to {action}: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitchat_shared::ValidationError;

    #[test]
    fn test_failure_notice_levels() {
        let n = Notice::for_failure("send message", &ValidationError::EmptyContent.into());
        assert_eq!(n, Notice::warning("Message content is required"));

        let n = Notice::for_failure(
            "send message",
            &ClientError::Api {
                status: 500,
                reason: "queue full".into(),
            },
        );
        assert_eq!(n, Notice::error("Failed to send message: queue full"));

        let n = Notice::for_failure("join channel", &ClientError::Network("refused".into()));
        assert_eq!(n, Notice::error("Network error: refused"));
    }
}
