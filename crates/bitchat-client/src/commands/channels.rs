use tracing::info;

use bitchat_net::ApiCall;
use bitchat_shared::constants::CHANNEL_REFRESH_DELAY;
use bitchat_shared::protocol::JoinChannelRequest;
use bitchat_shared::{ClientError, ValidationError};

use super::{CommandKind, Dispatcher, Outcome, ScheduledRefresh};
use crate::events::{Notice, Resource};

/// `general` -> `#general`; already-prefixed names are kept.
pub fn normalize_channel(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() || name == "#" {
        return Err(ValidationError::EmptyChannelName);
    }
    if name.starts_with('#') {
        Ok(name.to_string())
    } else {
        Ok(format!("#{name}"))
    }
}

impl Dispatcher {
    pub fn join_channel(&mut self, name: &str, password: &str) -> Result<u64, ClientError> {
        let channel = normalize_channel(name)?;
        info!(channel = %channel, protected = !password.is_empty(), "Joining channel");
        Ok(self.command(
            CommandKind::JoinChannel {
                channel: channel.clone(),
            },
            ApiCall::JoinChannel(JoinChannelRequest {
                channel,
                password: password.to_string(),
            }),
        ))
    }
}

pub(super) fn joined(channel: &str) -> Outcome {
    Outcome {
        notice: Some(Notice::info(format!("Joining channel {channel}"))),
        refresh: Some(ScheduledRefresh {
            resource: Resource::Channels,
            after: CHANNEL_REFRESH_DELAY,
        }),
        ..Outcome::default()
    }
}
