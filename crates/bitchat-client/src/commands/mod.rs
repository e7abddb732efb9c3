//! Command dispatcher.
//!
//! Each user intent is validated locally and, if it passes, becomes exactly
//! one backend request. Validation failures never reach the network. When the
//! response comes back through the event loop, [`Dispatcher::complete`] turns
//! it into an [`Outcome`] describing the feedback and state effects; the
//! dispatcher itself never touches presentation or the state store.
//!
//! Sub-modules group the intents by domain.

pub mod channels;
pub mod messaging;
pub mod mode;
pub mod profile;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use bitchat_net::{ApiCall, Transport};
use bitchat_shared::types::ConversationMode;
use bitchat_shared::ClientError;

use crate::events::{AppEvent, Notice, Origin, Resource};
use crate::sequence::RequestTracker;

/// Which intent a command request was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    SendPublic,
    SendPrivate { target: String },
    JoinChannel { channel: String },
    ChangeNickname { nickname: String },
    SwitchMode { mode: ConversationMode },
}

impl CommandKind {
    /// Verb phrase used in failure notices.
    fn action(&self) -> &'static str {
        match self {
            Self::SendPublic => "send message",
            Self::SendPrivate { .. } => "send private message",
            Self::JoinChannel { .. } => "join channel",
            Self::ChangeNickname { .. } => "update nickname",
            Self::SwitchMode { .. } => "switch mode",
        }
    }
}

/// A refresh to run after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRefresh {
    pub resource: Resource,
    pub after: Duration,
}

/// Effects of a completed command, applied by the event loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub notice: Option<Notice>,
    pub clear_input: bool,
    pub mode: Option<ConversationMode>,
    pub refresh: Option<ScheduledRefresh>,
}

impl Outcome {
    fn failure(kind: &CommandKind, err: &ClientError) -> Self {
        Self {
            notice: Some(Notice::for_failure(kind.action(), err)),
            ..Self::default()
        }
    }
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    events: mpsc::Sender<AppEvent>,
    tracker: RequestTracker,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, events: mpsc::Sender<AppEvent>) -> Self {
        Self {
            transport,
            events,
            tracker: RequestTracker::new(),
        }
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut RequestTracker {
        &mut self.tracker
    }

    /// Read one backend collection.
    pub fn fetch(&mut self, resource: Resource) -> u64 {
        self.issue(Origin::Read(resource), resource.call())
    }

    /// Turn a command response into its effects.
    pub fn complete(
        &mut self,
        seq: u64,
        kind: &CommandKind,
        result: Result<Value, ClientError>,
    ) -> Outcome {
        match result {
            Ok(_) => {
                debug!(seq, ?kind, "Command succeeded");
                match kind {
                    CommandKind::SendPublic => messaging::public_sent(),
                    CommandKind::SendPrivate { target } => messaging::private_sent(target),
                    CommandKind::JoinChannel { channel } => channels::joined(channel),
                    CommandKind::ChangeNickname { .. } => profile::nickname_changed(),
                    CommandKind::SwitchMode { mode: requested } => {
                        self.tracker.confirm_mode(seq);
                        mode::switched(requested)
                    }
                }
            }
            Err(e) => {
                warn!(seq, ?kind, error = %e, "Command failed");
                Outcome::failure(kind, &e)
            }
        }
    }

    fn command(&mut self, kind: CommandKind, call: ApiCall) -> u64 {
        self.issue(Origin::Command(kind), call)
    }

    /// Spawn the request; its completion is queued as an [`AppEvent::Response`].
    fn issue(&mut self, origin: Origin, call: ApiCall) -> u64 {
        let seq = self.tracker.next_seq();
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();

        debug!(seq, call = %call, "Issuing request");

        tokio::spawn(async move {
            let result = transport.request(&call).await;
            if events
                .send(AppEvent::Response {
                    seq,
                    origin,
                    result,
                })
                .await
                .is_err()
            {
                debug!(seq, "Event loop gone, dropping response");
            }
        });

        seq
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Transport double that records calls and replays scripted results per
    /// endpoint. Unscripted calls succeed with `null`.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        calls: Mutex<Vec<ApiCall>>,
        scripted: Mutex<HashMap<&'static str, VecDeque<Result<Value, ClientError>>>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn respond(&self, path: &'static str, result: Result<Value, ClientError>) {
            self.scripted
                .lock()
                .unwrap()
                .entry(path)
                .or_default()
                .push_back(result);
        }

        pub(crate) fn calls(&self) -> Vec<ApiCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn request(&self, call: &ApiCall) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push(call.clone());
            self.scripted
                .lock()
                .unwrap()
                .get_mut(call.path())
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(Value::Null))
        }
    }

    pub(crate) fn dispatcher() -> (Dispatcher, Arc<MockTransport>, mpsc::Receiver<AppEvent>) {
        let transport = MockTransport::new();
        let (tx, rx) = mpsc::channel(32);
        (Dispatcher::new(transport.clone(), tx), transport, rx)
    }

    pub(crate) async fn next_response(
        rx: &mut mpsc::Receiver<AppEvent>,
    ) -> (u64, Origin, Result<Value, ClientError>) {
        match rx.recv().await {
            Some(AppEvent::Response {
                seq,
                origin,
                result,
            }) => (seq, origin, result),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_issues_one_read() {
        let (mut d, transport, mut rx) = dispatcher();
        let seq = d.fetch(Resource::Peers);

        let (got_seq, origin, result) = next_response(&mut rx).await;
        assert_eq!(got_seq, seq);
        assert_eq!(origin, Origin::Read(Resource::Peers));
        assert!(result.is_ok());
        assert_eq!(transport.calls(), vec![ApiCall::GetPeers]);
    }

    #[tokio::test]
    async fn test_failed_command_reports_and_changes_nothing() {
        let (mut d, _, _rx) = dispatcher();
        let kind = CommandKind::SwitchMode {
            mode: ConversationMode::Channel("#x".into()),
        };
        let outcome = d.complete(
            4,
            &kind,
            Err(ClientError::Api {
                status: 400,
                reason: "no such channel".into(),
            }),
        );
        assert_eq!(outcome.mode, None);
        assert_eq!(outcome.refresh, None);
        assert_eq!(
            outcome.notice,
            Some(Notice::error("Failed to switch mode: no such channel"))
        );
        assert!(d.tracker().mode_is_current(1));
    }
}
