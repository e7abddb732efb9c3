use tracing::info;

use bitchat_net::ApiCall;
use bitchat_shared::constants::STATUS_REFRESH_DELAY;
use bitchat_shared::protocol::SwitchModeRequest;
use bitchat_shared::types::{ConversationMode, ModeKind};
use bitchat_shared::{ClientError, ValidationError};

use super::{CommandKind, Dispatcher, Outcome, ScheduledRefresh};
use crate::events::{Notice, Resource};

/// Resolve `(kind, target)` into the mode being requested.
pub fn requested_mode(kind: &str, target: &str) -> Result<ConversationMode, ValidationError> {
    let kind = ModeKind::parse(kind.trim())
        .ok_or_else(|| ValidationError::UnknownMode(kind.trim().to_string()))?;
    let target = target.trim();
    match kind {
        ModeKind::Public => Ok(ConversationMode::Public),
        _ if target.is_empty() => Err(ValidationError::EmptyTarget),
        ModeKind::Channel => Ok(ConversationMode::Channel(target.to_string())),
        ModeKind::Dm => Ok(ConversationMode::DirectMessage(target.to_string())),
    }
}

impl Dispatcher {
    pub fn switch_mode(&mut self, kind: &str, target: &str) -> Result<u64, ClientError> {
        let mode = requested_mode(kind, target)?;
        info!(mode = %mode.display_name(), "Switching conversation");
        let body = SwitchModeRequest {
            kind: mode.kind(),
            target: mode.target().to_string(),
        };
        Ok(self.command(CommandKind::SwitchMode { mode }, ApiCall::SwitchMode(body)))
    }
}

pub(super) fn switched(mode: &ConversationMode) -> Outcome {
    Outcome {
        notice: Some(Notice::info(format!(
            "Switched to {}",
            mode.display_name()
        ))),
        mode: Some(mode.clone()),
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
    fn test_requested_mode() {
        assert_eq!(requested_mode("public", ""), Ok(ConversationMode::Public));
        assert_eq!(
            requested_mode("channel", " #general "),
            Ok(ConversationMode::Channel("#general".into()))
        );
        assert_eq!(
            requested_mode("dm", "alice"),
            Ok(ConversationMode::DirectMessage("alice".into()))
        );
        assert_eq!(requested_mode("dm", " "), Err(ValidationError::EmptyTarget));
        assert_eq!(
            requested_mode("group", "x"),
            Err(ValidationError::UnknownMode("group".into()))
        );
    }

    #[tokio::test]
    async fn test_switch_success_sets_mode_and_confirms() {
        let (mut d, transport, mut rx) = dispatcher();
        let earlier_poll = d.fetch(Resource::Status);
        let seq = d.switch_mode("dm", "alice").unwrap();

        // Drain both responses; order between spawned tasks is not fixed.
        let mut switch_result = None;
        for _ in 0..2 {
            let (got, _, result) = next_response(&mut rx).await;
            if got == seq {
                switch_result = Some(result);
            }
        }
        assert!(transport.calls().contains(&ApiCall::SwitchMode(SwitchModeRequest {
            kind: ModeKind::Dm,
            target: "alice".into(),
        })));

        let mode = ConversationMode::DirectMessage("alice".into());
        let outcome = d.complete(
            seq,
            &CommandKind::SwitchMode { mode: mode.clone() },
            switch_result.expect("switch response"),
        );
        assert_eq!(outcome.mode, Some(mode));
        assert_eq!(outcome.notice, Some(Notice::info("Switched to DM with alice")));
        assert!(!d.tracker().mode_is_current(earlier_poll));
    }

    #[tokio::test]
    async fn test_channel_switch_applies_on_success() {
        let (mut d, _, mut rx) = dispatcher();
        d.switch_mode("channel", "#general").unwrap();
        let (seq, origin, result) = next_response(&mut rx).await;
        let crate::events::Origin::Command(kind) = origin else {
            panic!("expected command origin");
        };

        let outcome = d.complete(seq, &kind, result);
        assert_eq!(
            outcome.mode,
            Some(ConversationMode::Channel("#general".into()))
        );
        assert_eq!(outcome.notice, Some(Notice::info("Switched to #general")));
    }

    #[tokio::test]
    async fn test_switch_needs_target() {
        let (mut d, transport, _rx) = dispatcher();
        assert!(d.switch_mode("channel", "").is_err());
        assert!(transport.calls().is_empty());
    }
}
