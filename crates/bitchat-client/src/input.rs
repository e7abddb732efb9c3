//! Terminal input: one line of stdin becomes one [`Intent`].

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::AppEvent;

/// A user action, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Plain text for the current conversation.
    SendMessage(String),
    SendPrivate { target: String, content: String },
    JoinChannel { name: String, password: String },
    ChangeNickname(String),
    SwitchMode { kind: String, target: String },
    ShowInfo,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &[&str] = &[
    "/msg <nick> <text>        send a private message",
    "/join <#channel> [pass]   join a channel",
    "/nick <name>              change nickname",
    "/public                   switch to public chat",
    "/channel <#channel>       switch to a channel",
    "/dm <nick>                switch to a direct conversation",
    "/info                     connection summary",
    "/quit                     exit",
    "//text                    send text starting with '/'",
];

/// `None` for blank lines.
pub fn parse_line(line: &str) -> Option<Intent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    if let Some(escaped) = line.strip_prefix("//") {
        return Some(Intent::SendMessage(format!("/{escaped}")));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(Intent::SendMessage(line.to_string()));
    };

    let (name, rest) = split_word(command);
    let intent = match name {
        "msg" | "w" => {
            let (target, content) = split_word(rest);
            Intent::SendPrivate {
                target: target.to_string(),
                content: content.to_string(),
            }
        }
        "join" | "j" => {
            let (name, password) = split_word(rest);
            Intent::JoinChannel {
                name: name.to_string(),
                password: password.trim().to_string(),
            }
        }
        "nick" => Intent::ChangeNickname(rest.to_string()),
        "public" => Intent::SwitchMode {
            kind: "public".into(),
            target: String::new(),
        },
        "channel" => Intent::SwitchMode {
            kind: "channel".into(),
            target: rest.trim().to_string(),
        },
        "dm" => Intent::SwitchMode {
            kind: "dm".into(),
            target: rest.trim().to_string(),
        },
        "info" | "status" => Intent::ShowInfo,
        "help" | "?" => Intent::Help,
        "quit" | "exit" | "q" => Intent::Quit,
        other => Intent::Unknown(other.to_string()),
    };
    Some(intent)
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Forward stdin lines as intents until EOF, then request shutdown.
pub fn spawn_stdin_reader(events: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(intent) = parse_line(&line) else {
                        continue;
                    };
                    if events.send(AppEvent::Intent(intent)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
        let _ = events.send(AppEvent::Shutdown).await;
    })
}
