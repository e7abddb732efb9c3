//! Out-of-focus alerts for incoming messages.
//!
//! Permission is asked for once at startup; whatever the sink answers is
//! remembered for the rest of the session.

use std::io::{IsTerminal, Write};

use tracing::{debug, info};

use bitchat_shared::constants::APP_NAME;
use bitchat_shared::types::Message;

use crate::render::terminal::sanitize;

/// Notifications replace each other under this tag.
pub const NOTIFICATION_TAG: &str = "bitchat-message";

/// Alert only for messages from others while the user is away.
pub fn should_notify(message: &Message, has_focus: bool) -> bool {
    !has_focus && !message.is_own
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    pub title: String,
    pub body: String,
    pub tag: &'static str,
}

impl DesktopNotification {
    pub fn for_message(message: &Message) -> Self {
        let title = if message.is_private {
            "Private Message".to_string()
        } else if let Some(channel) = &message.channel {
            format!("#{}", channel.trim_start_matches('#'))
        } else {
            APP_NAME.to_string()
        };
        Self {
            title,
            body: format!("{}: {}", message.sender, message.content),
            tag: NOTIFICATION_TAG,
        }
    }
}

/// Where notifications are delivered.
pub trait NotificationSink {
    fn request_permission(&mut self) -> Permission;

    fn show(&mut self, notification: &DesktopNotification);
}

pub struct Notifier<S> {
    sink: S,
    permission: Permission,
    enabled: bool,
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(sink: S, enabled: bool) -> Self {
        Self {
            sink,
            permission: Permission::Default,
            enabled,
        }
    }

    /// Ask the sink for permission if it has not been asked before.
    pub fn init(&mut self) {
        if !self.enabled || self.permission != Permission::Default {
            return;
        }
        self.permission = self.sink.request_permission();
        info!(permission = ?self.permission, "Notification permission");
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Returns whether a notification was shown.
    pub fn on_message(&mut self, message: &Message, has_focus: bool) -> bool {
        if !self.enabled || self.permission != Permission::Granted {
            return false;
        }
        if !should_notify(message, has_focus) {
            return false;
        }
        let notification = DesktopNotification::for_message(message);
        debug!(title = %notification.title, "Showing notification");
        self.sink.show(&notification);
        true
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }
}

/// Rings the terminal bell and writes a one-line summary to stderr.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl NotificationSink for TerminalBell {
    fn request_permission(&mut self) -> Permission {
        if std::io::stderr().is_terminal() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn show(&mut self, notification: &DesktopNotification) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "\u{7}[{}] {}",
            sanitize(&notification.title),
            sanitize(&notification.body)
        );
    }
}
