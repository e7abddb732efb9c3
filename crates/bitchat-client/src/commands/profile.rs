use tracing::info;

use bitchat_net::ApiCall;
use bitchat_shared::constants::STATUS_REFRESH_DELAY;
use bitchat_shared::protocol::ChangeNicknameRequest;
use bitchat_shared::{ClientError, ValidationError};

use super::{CommandKind, Dispatcher, Outcome, ScheduledRefresh};
use crate::events::{Notice, Resource};

/// Nicknames are ASCII letters, digits, `_` and `-`.
pub fn validate_nickname(nickname: &str) -> Result<String, ValidationError> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(ValidationError::EmptyNickname);
    }
    let valid = nickname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ValidationError::InvalidNickname);
    }
    Ok(nickname.to_string())
}

impl Dispatcher {
    pub fn change_nickname(&mut self, nickname: &str) -> Result<u64, ClientError> {
        let nickname = validate_nickname(nickname)?;
        info!(nickname = %nickname, "Changing nickname");
        Ok(self.command(
            CommandKind::ChangeNickname {
                nickname: nickname.clone(),
            },
            ApiCall::ChangeNickname(ChangeNicknameRequest { nickname }),
        ))
    }
}

pub(super) fn nickname_changed() -> Outcome {
    Outcome {
        notice: Some(Notice::success("Nickname updated")),
        refresh: Some(ScheduledRefresh {
            resource: Resource::Status,
            after: STATUS_REFRESH_DELAY,
        }),
        ..Outcome::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{dispatcher, next_response};

    #[test]
    fn test_validate_nickname() {
        assert_eq!(validate_nickname(" night_owl-2 ").unwrap(), "night_owl-2");
        assert_eq!(validate_nickname(""), Err(ValidationError::EmptyNickname));
        assert_eq!(validate_nickname("bad name!"), Err(ValidationError::InvalidNickname));
        assert_eq!(validate_nickname("zoë"), Err(ValidationError::InvalidNickname));
    }

    #[tokio::test]
    async fn test_invalid_nickname_issues_no_request() {
        let (mut d, transport, _rx) = dispatcher();
        let err = d.change_nickname("bad name!").unwrap_err();
        assert_eq!(
            err,
            ClientError::Validation(ValidationError::InvalidNickname)
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_nickname_change_refreshes_status() {
        let (mut d, transport, mut rx) = dispatcher();
        d.change_nickname("anon42").unwrap();
        let (seq, _, result) = next_response(&mut rx).await;

        assert_eq!(
            transport.calls(),
            vec![ApiCall::ChangeNickname(ChangeNicknameRequest {
                nickname: "anon42".into()
            })]
        );
        let outcome = d.complete(
            seq,
            &CommandKind::ChangeNickname {
                nickname: "anon42".into(),
            },
            result,
        );
        assert_eq!(outcome.notice, Some(Notice::success("Nickname updated")));
        assert_eq!(
            outcome.refresh.map(|r| r.resource),
            Some(Resource::Status)
        );
    }
}
