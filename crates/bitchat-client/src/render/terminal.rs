use std::borrow::Cow;
use std::fmt::Write;

use super::view::{self, ListSection, MessageSection, View};
use super::Renderer;
use crate::state::ClientState;

/// Bidirectional embeddings, overrides, isolates and marks. They reorder the
/// text around them, so a sender could make its prefix read differently.
fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{061C}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
    )
}

fn needs_escape(c: char) -> bool {
    c.is_control() || is_bidi_control(c)
}

/// Neutralise control and bidi characters so remote text cannot inject
/// terminal escape sequences or reorder a line. Printable text is returned
/// as-is.
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(needs_escape) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if c.is_control() {
            out.extend(c.escape_debug());
        } else if is_bidi_control(c) {
            out.extend(c.escape_unicode());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

const RULE: &str = "────────────────────────────────────────────────────────";

/// Plain-text frame for a terminal, one section per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        Self
    }

    fn header(out: &mut String, view: &View) {
        let h = &view.header;
        let dot = if h.connected { '●' } else { '○' };
        let _ = writeln!(
            out,
            "{} {dot} {} | {} | peers {} | sessions {} | {}",
            h.app,
            h.status,
            sanitize(&h.nickname),
            h.peer_count,
            h.session_count,
            sanitize(&h.mode),
        );
    }

    fn sidebar(out: &mut String, view: &View) {
        let conversations: Vec<String> = view
            .conversations
            .iter()
            .map(|c| {
                let lock = if c.protected { " (locked)" } else { "" };
                if c.active {
                    format!("[{}{lock}]", sanitize(&c.label))
                } else {
                    format!("{}{lock}", sanitize(&c.label))
                }
            })
            .collect();
        let _ = writeln!(out, "Conversations: {}", conversations.join("  "));

        match &view.peers {
            ListSection::Empty(text) => {
                let _ = writeln!(out, "Peers: {text}");
            }
            ListSection::Items(peers) => {
                let names: Vec<String> = peers
                    .iter()
                    .map(|p| {
                        if p.secure {
                            format!("{} (secure)", sanitize(&p.nickname))
                        } else {
                            sanitize(&p.nickname).into_owned()
                        }
                    })
                    .collect();
                let _ = writeln!(out, "Peers: {}", names.join(", "));
            }
        }

        match &view.channels {
            ListSection::Empty(text) => {
                let _ = writeln!(out, "Channels: {text}");
            }
            ListSection::Items(channels) => {
                let names: Vec<String> = channels
                    .iter()
                    .map(|c| {
                        let mut flags = Vec::new();
                        if c.joined {
                            flags.push("joined");
                        }
                        if c.protected {
                            flags.push("locked");
                        }
                        if c.has_key {
                            flags.push("key");
                        }
                        if flags.is_empty() {
                            sanitize(&c.name).into_owned()
                        } else {
                            format!("{} ({})", sanitize(&c.name), flags.join(", "))
                        }
                    })
                    .collect();
                let _ = writeln!(out, "Channels: {}", names.join(", "));
            }
        }
    }

    fn messages(out: &mut String, view: &View) {
        match &view.messages {
            MessageSection::Welcome => {
                let _ = writeln!(out, "{}", view::WELCOME_TITLE);
                let _ = writeln!(out, "{}", view::WELCOME_TAGLINE);
                let _ = writeln!(out, "{}", view::WELCOME_HINT);
            }
            MessageSection::Items(lines) => {
                for line in lines {
                    let _ = writeln!(
                        out,
                        "[{}] {}: {}",
                        line.time,
                        sanitize(&line.prefix),
                        sanitize(&line.content),
                    );
                }
            }
        }
    }

    fn composer(out: &mut String, view: &View) {
        let c = &view.composer;
        let warn = if c.warn { " !" } else { "" };
        let _ = write!(out, "> {} ({}/{}{warn})", sanitize(&c.draft), c.chars, c.limit);
    }
}

impl Renderer for TerminalRenderer {
    type Output = String;

    fn render(&self, state: &ClientState) -> String {
        let view = view::build(state);
        let mut out = String::with_capacity(4096);
        Self::header(&mut out, &view);
        let _ = writeln!(out, "{RULE}");
        Self::sidebar(&mut out, &view);
        let _ = writeln!(out, "{RULE}");
        Self::messages(&mut out, &view);
        let _ = writeln!(out, "{RULE}");
        Self::composer(&mut out, &view);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::message;

    #[test]
    fn test_sanitize_escapes_control_chars() {
        assert!(matches!(sanitize("plain text"), Cow::Borrowed(_)));
        assert_eq!(sanitize("\u{1b}[2Jboom"), "\\u{1b}[2Jboom");
        assert_eq!(sanitize("a\nb"), "a\\nb");
    }

    #[test]
    fn test_sanitize_escapes_bidi_controls() {
        assert_eq!(sanitize("evil\u{202E}txt.exe"), "evil\\u{202e}txt.exe");
        assert_eq!(sanitize("\u{2066}x\u{2069}"), "\\u{2066}x\\u{2069}");
        assert_eq!(sanitize("a\u{200F}b"), "a\\u{200f}b");
        // Non-control non-ASCII text is left alone.
        assert!(matches!(sanitize("héllo → 世界"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_bidi_override_cannot_reorder_prefix() {
        let mut state = ClientState::new();
        state.append_message(message("\u{202E}ecila", "\u{2067}hi"));
        let frame = TerminalRenderer::new().render(&state);
        for c in ['\u{202E}', '\u{2067}'] {
            assert!(!frame.contains(c));
        }
        assert!(frame.contains("\\u{202e}ecila: \\u{2067}hi"));
    }

    #[test]
    fn test_ansi_injection_is_neutralised() {
        let mut state = ClientState::new();
        state.append_message(message("mallory", "\u{1b}]0;pwned\u{7}"));
        let frame = TerminalRenderer::new().render(&state);
        assert!(!frame.contains('\u{1b}'));
        assert!(!frame.contains('\u{7}'));
    }

    #[test]
    fn test_frame_contents() {
        let mut state = ClientState::new();
        let renderer = TerminalRenderer::new();
        let empty = renderer.render(&state);
        assert!(empty.contains("Disconnected"));
        assert!(empty.contains("Peers: No peers online"));
        assert!(empty.contains("Channels: No channels discovered"));
        assert!(empty.contains("Welcome to BitChat"));
        assert!(empty.contains("[Public Chat]"));

        state.append_message(message("alice", "hi all"));
        let frame = renderer.render(&state);
        let time = view::clock_time(state.history().iter().next().unwrap().timestamp(), &chrono::Local);
        assert!(frame.contains(&format!("[{time}] alice: hi all")));
        assert!(!frame.contains("Welcome to BitChat"));
        assert_eq!(frame, renderer.render(&state));
    }
}
