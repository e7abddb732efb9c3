//! Push half of the transport adapter.
//!
//! The backend delivers server-initiated events over Socket.IO. The channel
//! opens the Engine.IO WebSocket transport, joins the default namespace,
//! answers heartbeats and routes `42["name", data]` events to subscribers.
//! Each subscriber maps the payload onto the application's own event type;
//! the channel task forwards the results into an mpsc sink and reconnects with
//! backoff whenever the socket drops.

use std::collections::HashMap;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use bitchat_shared::ClientError;

use crate::retry::ReconnectPolicy;
use crate::socketio::{self, Frame, Packet, CONNECT, DISCONNECT, PONG};

/// Time allowed between opening the socket and the Engine.IO handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type EventHandler<E> = Box<dyn Fn(Value) -> Result<E, ClientError> + Send + Sync>;
type LifecycleHook<E> = Box<dyn Fn() -> E + Send + Sync>;

/// Why a live connection stopped pumping frames.
enum PumpEnd {
    /// Nobody is listening any more; stop for good.
    SinkClosed,
    /// The socket closed or failed; reconnect. `joined` is set when the
    /// namespace join had been accepted.
    Dropped { reason: String, joined: bool },
}

pub struct PushChannel<E> {
    url: String,
    policy: ReconnectPolicy,
    handlers: HashMap<String, Vec<EventHandler<E>>>,
    on_connect: Option<LifecycleHook<E>>,
    on_disconnect: Option<LifecycleHook<E>>,
}

impl<E: Send + 'static> PushChannel<E> {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            handlers: HashMap::new(),
            on_connect: None,
            on_disconnect: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register a listener for a named push event.
    pub fn subscribe<F>(&mut self, event: &str, handler: F)
    where
        F: Fn(Value) -> Result<E, ClientError> + Send + Sync + 'static,
    {
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    /// Hook fired each time the namespace is (re)joined.
    pub fn on_connect<F>(&mut self, hook: F)
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.on_connect = Some(Box::new(hook));
    }

    /// Hook fired each time a joined connection is lost.
    pub fn on_disconnect<F>(&mut self, hook: F)
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Box::new(hook));
    }

    /// Route one text frame to its subscribers.
    ///
    /// Only event packets produce anything. Malformed frames, unknown events
    /// and payloads a handler rejects are logged and dropped.
    pub fn dispatch(&self, text: &str) -> Vec<E> {
        match socketio::parse_frame(text) {
            Ok(Frame::Message(Packet::Event { name, data })) => self.route(&name, data),
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Malformed push frame");
                Vec::new()
            }
        }
    }

    fn route(&self, event: &str, data: Value) -> Vec<E> {
        let Some(handlers) = self.handlers.get(event) else {
            debug!(event, "No subscriber for push event");
            return Vec::new();
        };

        handlers
            .iter()
            .filter_map(|handler| match handler(data.clone()) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(event, error = %e, "Rejected push payload");
                    None
                }
            })
            .collect()
    }

    /// Run the channel in a background task until `sink` is closed or the
    /// reconnect policy gives up.
    pub fn spawn(self, sink: mpsc::Sender<E>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(sink).await })
    }

    async fn run(self, sink: mpsc::Sender<E>) {
        let mut attempt: u32 = 0;

        loop {
            if sink.is_closed() {
                break;
            }

            info!(url = %self.url, attempt, "Connecting push channel");
            match connect_async(self.url.as_str()).await {
                Ok((ws, _)) => match self.pump(ws, &sink).await {
                    PumpEnd::SinkClosed => return,
                    PumpEnd::Dropped { reason, joined } => {
                        warn!(reason = %reason, "Push channel dropped");
                        if joined {
                            attempt = 0;
                            if !self.fire(&self.on_disconnect, &sink).await {
                                return;
                            }
                        }
                    }
                },
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "Push channel connect failed");
                }
            }

            if !self.policy.should_retry(attempt) {
                warn!(
                    attempts = attempt,
                    "Giving up on push channel after max reconnect attempts"
                );
                break;
            }

            let delay = self.policy.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            debug!(delay_ms = delay.as_millis() as u64, "Push channel reconnect scheduled");

            tokio::select! {
                _ = sink.closed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("Push channel task ended");
    }

    async fn fire(&self, hook: &Option<LifecycleHook<E>>, sink: &mpsc::Sender<E>) -> bool {
        match hook {
            Some(hook) => sink.send(hook()).await.is_ok(),
            None => true,
        }
    }

    async fn pump(
        &self,
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        sink: &mpsc::Sender<E>,
    ) -> PumpEnd {
        let (mut write, mut read) = ws.split();
        let mut joined = false;
        let mut liveness = HANDSHAKE_TIMEOUT;
        let mut deadline = Instant::now() + liveness;

        loop {
            let frame = tokio::select! {
                _ = sink.closed() => {
                    let _ = write.send(WsMessage::Text(DISCONNECT.to_string())).await;
                    let _ = write.send(WsMessage::Close(None)).await;
                    return PumpEnd::SinkClosed;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return PumpEnd::Dropped {
                        reason: "no heartbeat from server".to_string(),
                        joined,
                    };
                }
                frame = read.next() => frame,
            };

            let text = match frame {
                Some(Ok(WsMessage::Text(text))) => text,
                Some(Ok(WsMessage::Close(_))) | None => {
                    return PumpEnd::Dropped {
                        reason: "closed by server".to_string(),
                        joined,
                    };
                }
                // WebSocket-level pings are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return PumpEnd::Dropped {
                        reason: e.to_string(),
                        joined,
                    };
                }
            };
            deadline = Instant::now() + liveness;

            let frame = match socketio::parse_frame(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Malformed push frame");
                    continue;
                }
            };

            let reply = match frame {
                Frame::Open(handshake) => {
                    debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Push handshake");
                    liveness = handshake.liveness();
                    deadline = Instant::now() + liveness;
                    Some(CONNECT)
                }
                Frame::Ping => Some(PONG),
                Frame::Close => {
                    return PumpEnd::Dropped {
                        reason: "closed by server".to_string(),
                        joined,
                    };
                }
                Frame::Message(Packet::Connect) => {
                    joined = true;
                    info!(url = %self.url, "Push channel connected");
                    if !self.fire(&self.on_connect, sink).await {
                        return PumpEnd::SinkClosed;
                    }
                    None
                }
                Frame::Message(Packet::Disconnect) => {
                    return PumpEnd::Dropped {
                        reason: "disconnected by server".to_string(),
                        joined,
                    };
                }
                Frame::Message(Packet::ConnectError(reason)) => {
                    return PumpEnd::Dropped {
                        reason: format!("connect refused: {reason}"),
                        joined,
                    };
                }
                Frame::Message(Packet::Event { name, data }) => {
                    for event in self.route(&name, data) {
                        if sink.send(event).await.is_err() {
                            return PumpEnd::SinkClosed;
                        }
                    }
                    None
                }
                Frame::Message(Packet::Ignored) | Frame::Pong | Frame::Upgrade | Frame::Noop => None,
            };

            if let Some(reply) = reply {
                if let Err(e) = write.send(WsMessage::Text(reply.to_string())).await {
                    return PumpEnd::Dropped {
                        reason: e.to_string(),
                        joined,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use tokio::net::TcpListener;

    const OPEN: &str = r#"0{"sid":"Jx8Vr2pGx0dAAAAB","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    const JOINED: &str = r#"40{"sid":"pQ3bY1vL9sNcAAAC"}"#;

    #[derive(Debug, PartialEq)]
    enum TestEvent {
        Up,
        Down,
        Status(String),
    }

    fn channel(url: &str, policy: ReconnectPolicy) -> PushChannel<TestEvent> {
        let mut push = PushChannel::new(url, policy.with_jitter(0.0));
        push.subscribe("connection_status", |data| {
            let status = data["status"]
                .as_str()
                .ok_or_else(|| ClientError::Protocol("missing status".into()))?;
            Ok(TestEvent::Status(status.to_string()))
        });
        push.on_connect(|| TestEvent::Up);
        push.on_disconnect(|| TestEvent::Down);
        push
    }

    fn quick() -> ReconnectPolicy {
        ReconnectPolicy::new(10, 50, 0)
    }

    fn socket_url(addr: std::net::SocketAddr) -> String {
        format!("ws://{addr}/socket.io/?EIO=4&transport=websocket")
    }

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    /// Serve one Socket.IO session: open, namespace join, `frames`, close.
    /// Returns the client's answers to pings.
    async fn serve_session(listener: &TcpListener, frames: &[&str]) -> Vec<String> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        ws.send(WsMessage::Text(OPEN.to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, CONNECT);
        ws.send(WsMessage::Text(JOINED.to_string())).await.unwrap();

        let mut replies = Vec::new();
        for frame in frames {
            ws.send(WsMessage::Text(frame.to_string())).await.unwrap();
            if *frame == "2" {
                replies.push(next_text(&mut ws).await);
            }
        }
        let _ = ws.close(None).await;
        replies
    }

    async fn recv(rx: &mut mpsc::Receiver<TestEvent>) -> TestEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("push event in time")
            .expect("channel open")
    }

    #[test]
    fn test_dispatch_routes_to_subscriber() {
        let push = channel("ws://unused", quick());
        let events = push.dispatch(r#"42["connection_status",{"status":"connected"}]"#);
        assert_eq!(events, vec![TestEvent::Status("connected".into())]);
    }

    #[test]
    fn test_dispatch_drops_unknown_and_malformed() {
        let push = channel("ws://unused", quick());
        assert!(push.dispatch(r#"42["typing",{}]"#).is_empty());
        assert!(push.dispatch("not json").is_empty());
        assert!(push.dispatch(r#"{"event":"connection_status","data":{"status":"connected"}}"#).is_empty());
        assert!(push.dispatch(r#"42["connection_status",{}]"#).is_empty());
        assert!(push.dispatch("2").is_empty());
    }

    #[test]
    fn test_multiple_subscribers_all_fire() {
        let mut push = channel("ws://unused", quick());
        push.subscribe("connection_status", |_| Ok(TestEvent::Up));
        let events = push.dispatch(r#"42["connection_status",{"status":"connecting"}]"#);
        assert_eq!(
            events,
            vec![TestEvent::Status("connecting".into()), TestEvent::Up]
        );
    }

    #[tokio::test]
    async fn test_lifecycle_and_events_over_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            serve_session(
                &listener,
                &[r#"42["connection_status",{"status":"connected"}]"#, "2"],
            )
            .await
        });

        let (tx, mut rx) = mpsc::channel(16);
        let handle = channel(&socket_url(addr), quick()).spawn(tx);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(recv(&mut rx).await);
        }
        assert_eq!(
            seen,
            vec![
                TestEvent::Up,
                TestEvent::Status("connected".into()),
                TestEvent::Down
            ]
        );
        assert_eq!(server.await.unwrap(), vec![PONG.to_string()]);

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task stops once the sink is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_resets_attempt_counter() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for _ in 0..3 {
                serve_session(&listener, &[]).await;
            }
        });

        // One retry allowed. The third session is only reached if each
        // successful join resets the counter.
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = channel(&socket_url(addr), ReconnectPolicy::new(10, 50, 1)).spawn(tx);

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(recv(&mut rx).await);
        }
        assert_eq!(
            seen,
            vec![
                TestEvent::Up,
                TestEvent::Down,
                TestEvent::Up,
                TestEvent::Down,
                TestEvent::Up
            ]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        // Accept the TCP connection and hang up before the WebSocket upgrade.
        let counter = accepted.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        let policy = ReconnectPolicy::new(1, 5, 2);
        let (tx, mut rx) = mpsc::channel(16);
        let handle = channel(&socket_url(addr), policy).spawn(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task gives up while the sink is still open")
            .unwrap();

        assert_eq!(
            accepted.load(Ordering::SeqCst),
            policy.max_attempts() as usize + 1
        );
        // Never joined, so no lifecycle events; the task's sender is gone.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_error_is_not_a_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(WsMessage::Text(OPEN.to_string())).await.unwrap();
            assert_eq!(next_text(&mut ws).await, CONNECT);
            ws.send(WsMessage::Text(r#"44{"message":"Not authorized"}"#.to_string()))
                .await
                .unwrap();
            let _ = ws.close(None).await;
        });

        let (tx, mut rx) = mpsc::channel(16);
        let handle = channel(&socket_url(addr), ReconnectPolicy::new(1, 5, 1)).spawn(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task gives up")
            .unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
