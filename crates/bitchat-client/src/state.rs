//! Client-side state store.
//!
//! [`ClientState`] is the single local mirror of the backend: connection
//! status, identity, active conversation, bounded message history and the
//! peer/channel lists. Every mutation is one method call that completes the
//! whole transition and bumps [`ClientState::revision`], so a renderer never
//! observes a half-applied update.

use std::collections::VecDeque;

use tracing::debug;

use bitchat_shared::constants::MAX_HISTORY;
use bitchat_shared::protocol::StatusResponse;
use bitchat_shared::types::{Channel, ConnectionStatus, ConversationMode, Message, Peer, UserInfo};

/// Append-only message log that keeps the newest `cap` entries.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    items: VecDeque<Message>,
    cap: usize,
}

impl MessageHistory {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            items: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Push to the tail, evicting from the head once over capacity.
    pub fn push(&mut self, message: Message) {
        self.items.push_back(message);
        while self.items.len() > self.cap {
            self.items.pop_front();
        }
    }

    /// Replace everything, keeping only the newest `cap` entries.
    pub fn replace(&mut self, messages: Vec<Message>) {
        let skip = messages.len().saturating_sub(self.cap);
        self.items = messages.into_iter().skip(skip).collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientState {
    connection: ConnectionStatus,
    user: UserInfo,
    mode: ConversationMode,
    history: MessageHistory,
    peers: Vec<Peer>,
    channels: Vec<Channel>,
    /// Text the user submitted but that has not been accepted yet.
    draft: String,
    /// Send request the draft is waiting on, if it passed validation.
    draft_seq: Option<u64>,
    revision: u64,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite connection status, user info and (if reported) the mode.
    pub fn apply_status(&mut self, status: StatusResponse) {
        self.connection = if status.connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        self.user = status.user_info();
        if let Some(mode) = status.current_mode.as_ref().and_then(|m| m.to_mode()) {
            if mode != self.mode {
                debug!(from = ?self.mode, to = ?mode, "Conversation mode reconciled from status");
            }
            self.mode = mode;
        }
        self.bump();
    }

    pub fn apply_peers(&mut self, peers: Vec<Peer>) {
        self.peers = peers;
        self.bump();
    }

    pub fn apply_channels(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
        self.bump();
    }

    pub fn apply_message_history(&mut self, messages: Vec<Message>) {
        self.history.replace(messages);
        self.bump();
    }

    pub fn append_message(&mut self, message: Message) {
        self.history.push(message);
        self.bump();
    }

    /// Optimistic local mode change, superseded by the next status poll.
    pub fn set_mode(&mut self, mode: ConversationMode) {
        self.mode = mode;
        self.bump();
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        self.connection = status;
        self.bump();
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
        self.draft_seq = None;
        self.bump();
    }

    /// Bind the current draft to the send request carrying it.
    pub fn tag_draft(&mut self, seq: u64) {
        self.draft_seq = Some(seq);
    }

    /// Clear the draft if it is still the one sent as `seq`. A newer draft
    /// survives the completion of an older send.
    pub fn clear_draft_for(&mut self, seq: u64) -> bool {
        if self.draft_seq != Some(seq) {
            return false;
        }
        self.draft_seq = None;
        self.clear_draft();
        true
    }

    pub fn clear_draft(&mut self) {
        if !self.draft.is_empty() {
            self.draft.clear();
            self.bump();
        }
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    pub fn mode(&self) -> &ConversationMode {
        &self.mode
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Monotonic counter bumped on every transition.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
