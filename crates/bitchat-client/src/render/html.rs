use std::fmt::Write;

use super::view::{self, ListSection, MessageKind, MessageSection, View};
use super::Renderer;
use crate::state::ClientState;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the client as one HTML fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    fn header(out: &mut String, view: &View) {
        let h = &view.header;
        let state = if h.connected { "connected" } else { "disconnected" };
        let _ = write!(
            out,
            "<header class=\"status-bar\">\
             <span class=\"status-indicator {state}\"></span>\
             <span class=\"status-text\">{}</span>\
             <span class=\"user-nickname\">{}</span>\
             <span class=\"peer-count\">{}</span>\
             <span class=\"session-count\">{}</span>\
             <span class=\"mode-text\">{}</span>\
             </header>",
            escape_html(h.status),
            escape_html(&h.nickname),
            h.peer_count,
            h.session_count,
            escape_html(&h.mode),
        );
    }

    fn conversations(out: &mut String, view: &View) {
        out.push_str("<div class=\"conversation-list\">");
        for item in &view.conversations {
            let active = if item.active { " active" } else { "" };
            let _ = write!(
                out,
                "<div class=\"conversation-item{active}\"><span>{}</span>{}</div>",
                escape_html(&item.label),
                if item.protected {
                    "<i class=\"lock\" title=\"Password protected\"></i>"
                } else {
                    ""
                },
            );
        }
        out.push_str("</div>");
    }

    fn peers(out: &mut String, view: &View) {
        out.push_str("<div class=\"peer-list\">");
        match &view.peers {
            ListSection::Empty(text) => placeholder(out, text),
            ListSection::Items(peers) => {
                for peer in peers {
                    let nick = escape_html(&peer.nickname);
                    let _ = write!(
                        out,
                        "<div class=\"peer-item\" data-nickname=\"{nick}\"><span>{nick}</span>{}</div>",
                        if peer.secure {
                            "<i class=\"secure\" title=\"Secure session\"></i>"
                        } else {
                            ""
                        },
                    );
                }
            }
        }
        out.push_str("</div>");
    }

    fn channels(out: &mut String, view: &View) {
        out.push_str("<div class=\"channel-list\">");
        match &view.channels {
            ListSection::Empty(text) => placeholder(out, text),
            ListSection::Items(channels) => {
                for ch in channels {
                    let name = escape_html(&ch.name);
                    let _ = write!(out, "<div class=\"channel-item\" data-channel=\"{name}\"><span>{name}</span>");
                    if ch.joined {
                        out.push_str("<span class=\"status-badge\">Joined</span>");
                    }
                    if ch.protected {
                        out.push_str("<i class=\"lock\" title=\"Password protected\"></i>");
                    }
                    if ch.has_key {
                        out.push_str("<i class=\"key\" title=\"Have key\"></i>");
                    }
                    out.push_str("</div>");
                }
            }
        }
        out.push_str("</div>");
    }

    fn messages(out: &mut String, view: &View) {
        out.push_str("<div class=\"messages\">");
        match &view.messages {
            MessageSection::Welcome => {
                let _ = write!(
                    out,
                    "<div class=\"welcome-message\"><h2>{}</h2><p>{}</p><p>{}</p></div>",
                    escape_html(view::WELCOME_TITLE),
                    escape_html(view::WELCOME_TAGLINE),
                    escape_html(view::WELCOME_HINT),
                );
            }
            MessageSection::Items(lines) => {
                for line in lines {
                    let owner = if line.own { "own" } else { "other" };
                    let kind = match line.kind {
                        MessageKind::Public => "",
                        MessageKind::Channel => " channel",
                        MessageKind::Private => " private",
                    };
                    let _ = write!(
                        out,
                        "<div class=\"message {owner}{kind}\">\
                         <div class=\"message-header\">\
                         <span class=\"message-sender\">{}</span>\
                         <span class=\"message-timestamp\">{}</span>\
                         </div>\
                         <div class=\"message-content\">{}</div>\
                         </div>",
                        escape_html(&line.prefix),
                        escape_html(&line.time),
                        escape_html(&line.content),
                    );
                }
            }
        }
        out.push_str("</div>");
    }

    fn composer(out: &mut String, view: &View) {
        let c = &view.composer;
        let warn = if c.warn { " text-warning" } else { "" };
        let _ = write!(
            out,
            "<div class=\"composer\"><span class=\"draft\">{}</span>\
             <span class=\"char-count{warn}\">{}/{}</span></div>",
            escape_html(&c.draft),
            c.chars,
            c.limit,
        );
    }
}

fn placeholder(out: &mut String, text: &str) {
    let _ = write!(out, "<div class=\"text-muted\">{}</div>", escape_html(text));
}

impl Renderer for HtmlRenderer {
    type Output = String;

    fn render(&self, state: &ClientState) -> String {
        let view = view::build(state);
        let mut out = String::with_capacity(4096);
        out.push_str("<div class=\"bitchat\">");
        Self::header(&mut out, &view);
        Self::conversations(&mut out, &view);
        Self::peers(&mut out, &view);
        Self::channels(&mut out, &view);
        Self::messages(&mut out, &view);
        Self::composer(&mut out, &view);
        out.push_str("</div>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::message;
    use bitchat_shared::types::Peer;

    fn peer(nickname: &str, fingerprint: Option<&str>) -> Peer {
        Peer {
            id: None,
            nickname: nickname.into(),
            fingerprint: fingerprint.map(str::to_string),
            is_online: true,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_script_payload_is_escaped() {
        let mut state = ClientState::new();
        state.append_message(message("<img src=x onerror=alert(1)>", "<script>alert(1)</script>"));
        let html = HtmlRenderer::new().render(&state);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut state = ClientState::new();
        state.append_message(message("alice", "hello"));
        state.apply_peers(vec![peer("alice", None)]);
        let renderer = HtmlRenderer::new();
        assert_eq!(renderer.render(&state), renderer.render(&state));
    }

    #[test]
    fn test_peer_list_transitions() {
        let mut state = ClientState::new();
        let renderer = HtmlRenderer::new();
        let html = renderer.render(&state);
        assert!(html.contains("No peers online"));
        assert!(html.contains("Welcome to BitChat"));

        state.apply_peers(vec![peer("alice", None)]);
        let html = renderer.render(&state);
        assert!(!html.contains("No peers online"));
        assert_eq!(html.matches("class=\"peer-item\"").count(), 1);
        assert!(html.contains(">alice<"));
        assert!(!html.contains("Secure session"));

        state.apply_peers(vec![peer("alice", Some("ab:cd"))]);
        assert!(renderer.render(&state).contains("Secure session"));
    }
}
