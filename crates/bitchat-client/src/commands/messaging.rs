use tracing::info;

use bitchat_net::ApiCall;
use bitchat_shared::constants::MAX_MESSAGE_CHARS;
use bitchat_shared::protocol::{SendMessageRequest, SendPrivateRequest};
use bitchat_shared::{ClientError, ValidationError};

use super::{CommandKind, Dispatcher, Outcome};
use crate::events::Notice;

/// Trimmed content, or the reason it cannot be sent.
pub fn validate_content(content: &str) -> Result<String, ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let len = content.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(content.to_string())
}

impl Dispatcher {
    /// Send to the current public/channel conversation.
    pub fn send_public_message(&mut self, content: &str) -> Result<u64, ClientError> {
        let content = validate_content(content)?;
        info!(len = content.len(), "Sending message");
        Ok(self.command(
            CommandKind::SendPublic,
            ApiCall::SendMessage(SendMessageRequest { content }),
        ))
    }

    pub fn send_private_message(
        &mut self,
        target: &str,
        content: &str,
    ) -> Result<u64, ClientError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ValidationError::EmptyTarget.into());
        }
        let content = validate_content(content)?;
        info!(target, "Sending private message");
        Ok(self.command(
            CommandKind::SendPrivate {
                target: target.to_string(),
            },
            ApiCall::SendPrivate(SendPrivateRequest {
                content,
                target: target.to_string(),
            }),
        ))
    }
}

pub(super) fn public_sent() -> Outcome {
    Outcome {
        clear_input: true,
        ..Outcome::default()
    }
}

pub(super) fn private_sent(target: &str) -> Outcome {
    Outcome {
        notice: Some(Notice::success(format!("Private message sent to {target}"))),
        ..Outcome::default()
    }
}
