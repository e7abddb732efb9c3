//! Application context and the single-consumer event loop.
//!
//! [`AppContext`] owns the state store, the command dispatcher, the renderer,
//! the output surface and the notifier. Producers (stdin, the poll ticker, the
//! push channel, request tasks, delayed refresh timers) only ever post
//! [`AppEvent`]s; the loop handles each one to completion before taking the
//! next, so state transitions never interleave.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use bitchat_net::{decode, PushChannel, Transport};
use bitchat_shared::constants::{EVENT_CONNECTION_STATUS, EVENT_NEW_MESSAGE};
use bitchat_shared::protocol::{ConnectionStatusEvent, StatusResponse};
use bitchat_shared::types::{Channel, ConnectionStatus, Message, Peer};
use bitchat_shared::ClientError;

use crate::commands::{Dispatcher, Outcome};
use crate::config::ClientConfig;
use crate::events::{AppEvent, Notice, Origin, Resource};
use crate::input::{Intent, HELP};
use crate::notifier::{NotificationSink, Notifier};
use crate::render::Renderer;
use crate::state::ClientState;
use crate::surface::Surface;

/// Read order on startup.
const STARTUP_LOAD: [Resource; 4] = [
    Resource::Status,
    Resource::Peers,
    Resource::Channels,
    Resource::Messages,
];

/// Refreshed on every poll tick.
const POLLED: [Resource; 3] = [Resource::Status, Resource::Peers, Resource::Channels];

pub struct AppContext<R, S, N> {
    state: ClientState,
    dispatcher: Dispatcher,
    renderer: R,
    surface: S,
    notifier: Notifier<N>,
    events: mpsc::Sender<AppEvent>,
    rendered: Option<u64>,
}

impl<R, S, N> AppContext<R, S, N>
where
    R: Renderer<Output = String>,
    S: Surface,
    N: NotificationSink,
{
    pub fn new(
        transport: Arc<dyn Transport>,
        events: mpsc::Sender<AppEvent>,
        renderer: R,
        surface: S,
        notifier: Notifier<N>,
    ) -> Self {
        Self {
            state: ClientState::new(),
            dispatcher: Dispatcher::new(transport, events.clone()),
            renderer,
            surface,
            notifier,
            events,
            rendered: None,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Ask for notification permission, draw the empty frame and load the
    /// initial data.
    pub fn startup(&mut self) {
        self.notifier.init();
        self.render_if_changed();
        for resource in STARTUP_LOAD {
            self.dispatcher.fetch(resource);
        }
    }

    /// Drive the loop until shutdown is requested or every producer is gone.
    pub async fn run(mut self, mut events: mpsc::Receiver<AppEvent>) {
        self.startup();
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
            self.render_if_changed();
        }
        info!("Event loop stopped");
    }

    /// Handle one event. Returns `false` when the client should exit.
    pub fn handle(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Intent(intent) => {
                self.surface.input_activity();
                return self.handle_intent(intent);
            }
            AppEvent::PollTick => {
                for resource in POLLED {
                    self.dispatcher.fetch(resource);
                }
            }
            AppEvent::Refresh(resource) => {
                self.dispatcher.fetch(resource);
            }
            AppEvent::ConnectionStatus(status) => {
                debug!(%status, "Connection status pushed");
                self.state.set_connection_status(status);
            }
            AppEvent::NewMessage(message) => {
                let focused = self.surface.has_focus();
                self.notifier.on_message(&message, focused);
                self.state.append_message(message);
            }
            AppEvent::PushConnected => {
                self.surface.show_notice(&Notice::success("Connected to server"));
            }
            AppEvent::PushDisconnected => {
                self.state.set_connection_status(ConnectionStatus::Disconnected);
                self.surface.show_notice(&Notice::error("Disconnected from server"));
            }
            AppEvent::Response {
                seq,
                origin,
                result,
            } => match origin {
                Origin::Read(resource) => self.apply_read(seq, resource, result),
                Origin::Command(kind) => {
                    let outcome = self.dispatcher.complete(seq, &kind, result);
                    self.apply_outcome(seq, outcome);
                }
            },
            AppEvent::Shutdown => return false,
        }
        true
    }

    /// Redraw if the state moved since the last frame.
    pub fn render_if_changed(&mut self) {
        let revision = self.state.revision();
        if self.rendered == Some(revision) {
            return;
        }
        let frame = self.renderer.render(&self.state);
        self.surface.present(&frame);
        self.rendered = Some(revision);
    }

    fn handle_intent(&mut self, intent: Intent) -> bool {
        let result = match intent {
            Intent::SendMessage(text) => {
                self.state.set_draft(text.as_str());
                let sent = self.dispatcher.send_public_message(&text);
                if let Ok(seq) = sent {
                    self.state.tag_draft(seq);
                }
                sent
            }
            Intent::SendPrivate { target, content } => {
                self.dispatcher.send_private_message(&target, &content)
            }
            Intent::JoinChannel { name, password } => {
                self.dispatcher.join_channel(&name, &password)
            }
            Intent::ChangeNickname(nickname) => self.dispatcher.change_nickname(&nickname),
            Intent::SwitchMode { kind, target } => self.dispatcher.switch_mode(&kind, &target),
            Intent::ShowInfo => {
                let summary = self.info_summary();
                self.surface.show_notice(&Notice::info(summary));
                return true;
            }
            Intent::Help => {
                for line in HELP {
                    self.surface.show_notice(&Notice::info(*line));
                }
                return true;
            }
            Intent::Unknown(command) => {
                self.surface.show_notice(&Notice::warning(format!(
                    "Unknown command: /{command} (try /help)"
                )));
                return true;
            }
            Intent::Quit => return false,
        };

        if let Err(e) = result {
            debug!(error = %e, "Intent rejected");
            self.surface.show_notice(&Notice::for_failure("complete request", &e));
        }
        true
    }

    fn info_summary(&self) -> String {
        let user = self.state.user();
        format!(
            "Nickname: {} | Peer ID: {} | Status: {} | Peers: {} | Secure Sessions: {}",
            user.nickname,
            user.peer_id,
            self.state.connection(),
            user.peer_count,
            user.session_count,
        )
    }

    fn apply_read(&mut self, seq: u64, resource: Resource, result: Result<Value, ClientError>) {
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                // Poll failures are not surfaced; the next tick retries.
                warn!(%resource, seq, error = %e, "Failed to load");
                return;
            }
        };

        let applied = match resource {
            Resource::Status => decode::<StatusResponse>(value).map(|mut status| {
                let fresh = self.accept(resource, seq);
                if fresh {
                    if !self.dispatcher.tracker().mode_is_current(seq) {
                        debug!(seq, "Status predates mode switch, keeping local mode");
                        status.current_mode = None;
                    }
                    self.state.apply_status(status);
                }
                fresh
            }),
            Resource::Peers => decode::<Vec<Peer>>(value).map(|peers| {
                let fresh = self.accept(resource, seq);
                if fresh {
                    self.state.apply_peers(peers);
                }
                fresh
            }),
            Resource::Channels => decode::<Vec<Channel>>(value).map(|channels| {
                let fresh = self.accept(resource, seq);
                if fresh {
                    self.state.apply_channels(channels);
                }
                fresh
            }),
            Resource::Messages => decode::<Vec<Message>>(value).map(|messages| {
                let fresh = self.accept(resource, seq);
                if fresh {
                    self.state.apply_message_history(messages);
                }
                fresh
            }),
        };

        match applied {
            Ok(true) => {}
            Ok(false) => debug!(%resource, seq, "Dropped stale response"),
            Err(e) => warn!(%resource, seq, error = %e, "Unreadable response"),
        }
    }

    fn accept(&mut self, resource: Resource, seq: u64) -> bool {
        self.dispatcher.tracker_mut().accept(resource, seq)
    }

    fn apply_outcome(&mut self, seq: u64, outcome: Outcome) {
        if let Some(mode) = outcome.mode {
            self.state.set_mode(mode);
        }
        if outcome.clear_input && !self.state.clear_draft_for(seq) {
            debug!(seq, "Draft changed since this send, keeping it");
        }
        if let Some(notice) = outcome.notice {
            self.surface.show_notice(&notice);
        }
        if let Some(refresh) = outcome.refresh {
            schedule(
                self.events.clone(),
                refresh.after,
                AppEvent::Refresh(refresh.resource),
            );
        }
    }
}

/// Post `event` after `delay`.
pub fn schedule(events: mpsc::Sender<AppEvent>, delay: Duration, event: AppEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = events.send(event).await;
    })
}

/// Post a [`AppEvent::PollTick`] every `interval`, starting one interval from
/// now.
pub fn spawn_poller(events: mpsc::Sender<AppEvent>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if events.send(AppEvent::PollTick).await.is_err() {
                break;
            }
        }
    })
}

/// Push channel wired to the client's events.
pub fn build_push_channel(config: &ClientConfig) -> PushChannel<AppEvent> {
    let mut push = PushChannel::new(config.push_url.clone(), config.reconnect);
    push.subscribe(EVENT_CONNECTION_STATUS, |data| {
        let event: ConnectionStatusEvent = decode(data)?;
        Ok(AppEvent::ConnectionStatus(ConnectionStatus::from_wire(
            &event.status,
        )))
    });
    push.subscribe(EVENT_NEW_MESSAGE, |data| {
        decode::<Message>(data).map(AppEvent::NewMessage)
    });
    push.on_connect(|| AppEvent::PushConnected);
    push.on_disconnect(|| AppEvent::PushDisconnected);
    push
}
