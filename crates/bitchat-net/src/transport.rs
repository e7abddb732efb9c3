//! Request/response half of the transport adapter.
//!
//! Every backend call is an [`ApiCall`]; a [`Transport`] turns one into a JSON
//! value or a typed [`ClientError`]. [`HttpTransport`] is the production
//! implementation over `reqwest`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use bitchat_shared::constants::*;
use bitchat_shared::protocol::{
    ChangeNicknameRequest, ErrorBody, JoinChannelRequest, SendMessageRequest, SendPrivateRequest,
    SwitchModeRequest,
};
use bitchat_shared::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One call against the backend REST surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    GetStatus,
    GetPeers,
    GetChannels,
    GetMessages,
    SendMessage(SendMessageRequest),
    SendPrivate(SendPrivateRequest),
    JoinChannel(JoinChannelRequest),
    ChangeNickname(ChangeNicknameRequest),
    SwitchMode(SwitchModeRequest),
}

impl ApiCall {
    pub fn method(&self) -> HttpMethod {
        match self {
            Self::GetStatus | Self::GetPeers | Self::GetChannels | Self::GetMessages => {
                HttpMethod::Get
            }
            _ => HttpMethod::Post,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::GetStatus => API_STATUS,
            Self::GetPeers => API_PEERS,
            Self::GetChannels => API_CHANNELS,
            Self::GetMessages => API_MESSAGES,
            Self::SendMessage(_) => API_SEND_MESSAGE,
            Self::SendPrivate(_) => API_SEND_PRIVATE,
            Self::JoinChannel(_) => API_JOIN_CHANNEL,
            Self::ChangeNickname(_) => API_CHANGE_NICKNAME,
            Self::SwitchMode(_) => API_SWITCH_MODE,
        }
    }

    /// JSON body for POST calls.
    pub fn body(&self) -> Option<Value> {
        let body = match self {
            Self::GetStatus | Self::GetPeers | Self::GetChannels | Self::GetMessages => {
                return None
            }
            Self::SendMessage(req) => serde_json::to_value(req),
            Self::SendPrivate(req) => serde_json::to_value(req),
            Self::JoinChannel(req) => serde_json::to_value(req),
            Self::ChangeNickname(req) => serde_json::to_value(req),
            Self::SwitchMode(req) => serde_json::to_value(req),
        };
        // Plain structs of strings always serialize.
        body.ok()
    }
}

impl fmt::Display for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self.method() {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        };
        write!(f, "{method} {}", self.path())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, call: &ApiCall) -> Result<Value, ClientError>;
}

/// Decode a successful response into a concrete type.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(ClientError::from)
}

/// HTTP transport against the backend base URL.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, call: &ApiCall) -> String {
        format!("{}{}", self.base_url, call.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, call: &ApiCall) -> Result<Value, ClientError> {
        let url = self.url(call);
        let builder = match call.method() {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => {
                let body = call.body().unwrap_or(Value::Null);
                self.client.post(&url).json(&body)
            }
        };

        let resp = builder.send().await.map_err(|e| {
            warn!(call = %call, error = %e, "Request failed");
            ClientError::Network(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read response: {e}")))?;

        debug!(call = %call, status, len = bytes.len(), "Response received");
        interpret_response(status, &bytes)
    }
}

/// Map a raw HTTP status and body onto the client error taxonomy.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<Value, ClientError> {
    if (200..300).contains(&status) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(body).map_err(ClientError::from);
    }

    let reason = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string()
        });

    Err(ClientError::Api { status, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitchat_shared::types::ModeKind;

    #[test]
    fn test_call_routes() {
        assert_eq!(ApiCall::GetStatus.to_string(), "GET /api/status");
        let call = ApiCall::SwitchMode(SwitchModeRequest {
            kind: ModeKind::Dm,
            target: "alice".into(),
        });
        assert_eq!(call.to_string(), "POST /api/switch_mode");
        assert_eq!(
            call.body(),
            Some(serde_json::json!({"type": "dm", "target": "alice"}))
        );
        assert_eq!(ApiCall::GetPeers.body(), None);
    }

    #[test]
    fn test_success_with_json_body() {
        let value = interpret_response(200, br#"[{"nickname":"alice"}]"#).unwrap();
        assert_eq!(value[0]["nickname"], "alice");
    }

    #[test]
    fn test_success_with_empty_body_is_null() {
        assert_eq!(interpret_response(204, b"").unwrap(), Value::Null);
    }

    #[test]
    fn test_success_with_garbage_is_protocol_error() {
        let err = interpret_response(200, b"<html>").unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_failure_uses_server_reason() {
        let err = interpret_response(400, br#"{"error":"Content and target required"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Api {
                status: 400,
                reason: "Content and target required".into()
            }
        );
    }

    #[test]
    fn test_failure_without_body_falls_back_to_status_text() {
        let err = interpret_response(500, b"").unwrap_err();
        assert_eq!(
            err,
            ClientError::Api {
                status: 500,
                reason: "Internal Server Error".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let transport =
            HttpTransport::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:9");
        let err = transport.request(&ApiCall::GetStatus).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }
}
