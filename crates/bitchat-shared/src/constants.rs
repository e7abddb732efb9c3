use std::time::Duration;

/// Application name
pub const APP_NAME: &str = "BitChat";

/// Maximum number of messages kept in local history
pub const MAX_HISTORY: usize = 50;

/// Maximum outgoing message length in characters (client-enforced)
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Character count above which the composer counter is flagged
pub const MESSAGE_CHARS_WARNING: usize = 900;

/// Interval between status/peers/channels polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Delay before refreshing channels after a successful join
pub const CHANNEL_REFRESH_DELAY: Duration = Duration::from_millis(1000);

/// Delay before refreshing status after a nickname change or mode switch
pub const STATUS_REFRESH_DELAY: Duration = Duration::from_millis(500);

/// Default backend base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Socket.IO endpoint relative to the backend base URL (Engine.IO v4,
/// WebSocket transport)
pub const PUSH_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Push event names
pub const EVENT_CONNECTION_STATUS: &str = "connection_status";
pub const EVENT_NEW_MESSAGE: &str = "new_message";

/// REST endpoints
pub const API_STATUS: &str = "/api/status";
pub const API_PEERS: &str = "/api/peers";
pub const API_CHANNELS: &str = "/api/channels";
pub const API_MESSAGES: &str = "/api/messages";
pub const API_SEND_MESSAGE: &str = "/api/send_message";
pub const API_SEND_PRIVATE: &str = "/api/send_private";
pub const API_JOIN_CHANNEL: &str = "/api/join_channel";
pub const API_CHANGE_NICKNAME: &str = "/api/change_nickname";
pub const API_SWITCH_MODE: &str = "/api/switch_mode";
