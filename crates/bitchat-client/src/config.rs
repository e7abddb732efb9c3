//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts against a local backend
//! with zero configuration.

use std::str::FromStr;
use std::time::Duration;

use bitchat_net::ReconnectPolicy;
use bitchat_shared::constants::{DEFAULT_SERVER_URL, POLL_INTERVAL, PUSH_PATH};

/// How frames are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Full-screen redraw of a plain-text view.
    Terminal,
    /// One HTML fragment per frame, for embedding in another surface.
    Html,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" | "text" => Ok(Self::Terminal),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    /// Env: `BITCHAT_SERVER_URL`
    /// Default: `http://localhost:5000`
    pub server_url: String,

    /// Push channel URL.
    /// Env: `BITCHAT_PUSH_URL`
    /// Default: the server's Socket.IO endpoint with a ws/wss scheme.
    pub push_url: String,

    /// Interval between status/peers/channels polls.
    /// Env: `BITCHAT_POLL_INTERVAL_SECS`
    pub poll_interval: Duration,

    /// Per-request HTTP timeout.
    /// Env: `BITCHAT_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,

    /// Push channel reconnect backoff.
    /// Env: `BITCHAT_RECONNECT_BASE_MS`, `BITCHAT_RECONNECT_MAX_MS`,
    /// `BITCHAT_RECONNECT_MAX_ATTEMPTS` (0 = unlimited)
    pub reconnect: ReconnectPolicy,

    /// The terminal counts as focused for this long after the last input.
    /// Env: `BITCHAT_FOCUS_IDLE_SECS`
    pub focus_idle: Duration,

    /// Whether desktop-style notifications are requested at all.
    /// Env: `BITCHAT_NOTIFICATIONS` (true/false)
    pub notifications: bool,

    /// Env: `BITCHAT_OUTPUT` (terminal/html)
    pub output: OutputFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            push_url: derive_push_url(DEFAULT_SERVER_URL),
            poll_interval: POLL_INTERVAL,
            request_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            focus_idle: Duration::from_secs(120),
            notifications: true,
            output: OutputFormat::Terminal,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("BITCHAT_SERVER_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.is_empty() {
                tracing::warn!("Empty BITCHAT_SERVER_URL, using default");
            } else {
                config.push_url = derive_push_url(&url);
                config.server_url = url;
            }
        }

        if let Ok(url) = std::env::var("BITCHAT_PUSH_URL") {
            if !url.trim().is_empty() {
                config.push_url = url.trim().to_string();
            }
        }

        if let Some(secs) = env_parse::<u64>("BITCHAT_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }

        if let Some(secs) = env_parse::<u64>("BITCHAT_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }

        let base_ms = env_parse::<u64>("BITCHAT_RECONNECT_BASE_MS").unwrap_or(500);
        let max_ms = env_parse::<u64>("BITCHAT_RECONNECT_MAX_MS").unwrap_or(30_000);
        let max_attempts = env_parse::<u32>("BITCHAT_RECONNECT_MAX_ATTEMPTS").unwrap_or(0);
        config.reconnect = ReconnectPolicy::new(base_ms, max_ms, max_attempts);

        if let Some(secs) = env_parse::<u64>("BITCHAT_FOCUS_IDLE_SECS") {
            config.focus_idle = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("BITCHAT_NOTIFICATIONS") {
            config.notifications = parse_flag(&val);
        }

        if let Some(output) = env_parse::<OutputFormat>("BITCHAT_OUTPUT") {
            config.output = output;
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

/// `http://host:5000/` -> `ws://host:5000/socket.io/?EIO=4&transport=websocket`
pub fn derive_push_url(server_url: &str) -> String {
    let base = server_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        format!("ws://{base}")
    };
    format!("{ws_base}{PUSH_PATH}")
}

fn parse_flag(val: &str) -> bool {
    let val = val.trim();
    val != "false" && val != "0"
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert_eq!(
            config.push_url,
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.output, OutputFormat::Terminal);
    }

    #[test]
    fn test_derive_push_url() {
        assert_eq!(
            derive_push_url("https://chat.example.org/"),
            "wss://chat.example.org/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            derive_push_url("10.0.0.2:5000"),
            "ws://10.0.0.2:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            derive_push_url("ws://relay:9000"),
            "ws://relay:9000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" 0 "));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("HTML".parse::<OutputFormat>(), Ok(OutputFormat::Html));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Terminal));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
