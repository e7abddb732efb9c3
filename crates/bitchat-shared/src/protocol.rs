//! Wire shapes of the backend REST surface and push event payloads.

use serde::{Deserialize, Serialize};

use crate::types::{ConversationMode, ModeKind, UserInfo};

/// Response body of `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub connected: bool,
    pub nickname: String,
    pub peer_id: String,
    #[serde(default)]
    pub peer_count: u32,
    #[serde(default)]
    pub session_count: u32,
    #[serde(default)]
    pub current_mode: Option<ModeInfo>,
}

impl StatusResponse {
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            nickname: self.nickname.clone(),
            peer_id: self.peer_id.clone(),
            peer_count: self.peer_count,
            session_count: self.session_count,
        }
    }
}

/// `current_mode` as reported by the backend: `{type, name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl ModeInfo {
    /// Map the backend's mode description onto a [`ConversationMode`].
    ///
    /// DM names arrive as `DM with <nick>`; the prefix is stripped. Unknown
    /// mode types yield `None` so callers keep their current mode.
    pub fn to_mode(&self) -> Option<ConversationMode> {
        match ModeKind::parse(&self.kind)? {
            ModeKind::Public => Some(ConversationMode::Public),
            ModeKind::Channel => Some(ConversationMode::Channel(self.name.clone())),
            ModeKind::Dm => {
                let nick = self.name.strip_prefix("DM with ").unwrap_or(&self.name);
                Some(ConversationMode::DirectMessage(nick.to_string()))
            }
        }
    }
}

impl From<&ConversationMode> for ModeInfo {
    fn from(mode: &ConversationMode) -> Self {
        Self {
            kind: mode.kind().as_str().to_string(),
            name: mode.display_name(),
        }
    }
}

/// `{"error": "..."}` body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendPrivateRequest {
    pub content: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinChannelRequest {
    pub channel: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeNicknameRequest {
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwitchModeRequest {
    #[serde(rename = "type")]
    pub kind: ModeKind,
    pub target: String,
}

/// Payload of the `connection_status` push event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionStatusEvent {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_with_mode() {
        let json = r#"{
            "connected": true,
            "nickname": "anon1234",
            "peer_id": "deadbeef",
            "peer_count": 3,
            "session_count": 1,
            "current_mode": {"type": "dm", "name": "DM with alice"}
        }"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(status.user_info().peer_count, 3);
        assert_eq!(
            status.current_mode.unwrap().to_mode(),
            Some(ConversationMode::DirectMessage("alice".into()))
        );
    }

    #[test]
    fn test_unknown_mode_is_ignored() {
        let info = ModeInfo {
            kind: "unknown".into(),
            name: "Unknown".into(),
        };
        assert_eq!(info.to_mode(), None);
    }

    #[test]
    fn test_switch_mode_request_uses_type_key() {
        let body = serde_json::to_value(SwitchModeRequest {
            kind: ModeKind::Channel,
            target: "#general".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"type": "channel", "target": "#general"}));
    }
}
