//! Where frames and notices end up.

use std::collections::VecDeque;
use std::io::Write;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::OutputFormat;
use crate::events::{Notice, NoticeLevel};
use crate::render::html::escape_html;
use crate::render::terminal::sanitize;

/// Notices stay on screen this long.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

const CLEAR_SCREEN: &str = "\u{1b}[2J\u{1b}[H";

pub trait Surface {
    /// Replace what is shown with `frame`.
    fn present(&mut self, frame: &str);

    fn show_notice(&mut self, notice: &Notice);

    /// Whether the user is looking at the client right now.
    fn has_focus(&self) -> bool;

    /// The user typed something.
    fn input_activity(&mut self) {}
}

/// Writes frames to a byte stream (stdout in production).
///
/// In terminal mode every frame clears the screen and live notices are drawn
/// under it. In HTML mode frames and notices are appended as fragments.
pub struct StreamSurface<W> {
    out: W,
    format: OutputFormat,
    focus_idle: Duration,
    last_input: Option<Instant>,
    notices: VecDeque<(Instant, Notice)>,
    frame: String,
}

impl StreamSurface<std::io::Stdout> {
    pub fn stdout(format: OutputFormat, focus_idle: Duration) -> Self {
        Self::new(std::io::stdout(), format, focus_idle)
    }
}

impl<W: Write> StreamSurface<W> {
    pub fn new(out: W, format: OutputFormat, focus_idle: Duration) -> Self {
        Self {
            out,
            format,
            focus_idle,
            last_input: None,
            notices: VecDeque::new(),
            frame: String::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.notices.front() {
            if now.duration_since(*at) < NOTICE_TTL {
                break;
            }
            self.notices.pop_front();
        }
    }

    fn redraw(&mut self) {
        let mut buf = String::with_capacity(self.frame.len() + 256);
        buf.push_str(CLEAR_SCREEN);
        buf.push_str(&self.frame);
        buf.push('\n');
        for (_, notice) in &self.notices {
            buf.push_str(&format!(
                "{} {}\n",
                notice_tag(notice.level),
                sanitize(&notice.text)
            ));
        }
        self.write(&buf);
    }

    fn write(&mut self, s: &str) {
        let result = self
            .out
            .write_all(s.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to write frame");
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

fn notice_tag(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "[ok]",
        NoticeLevel::Info => "[info]",
        NoticeLevel::Warning => "[warn]",
        NoticeLevel::Error => "[error]",
    }
}

fn notice_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "success",
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

impl<W: Write> Surface for StreamSurface<W> {
    fn present(&mut self, frame: &str) {
        self.frame = frame.to_string();
        match self.format {
            OutputFormat::Terminal => {
                self.prune(Instant::now());
                self.redraw();
            }
            OutputFormat::Html => self.write(&format!("{frame}\n")),
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        match self.format {
            OutputFormat::Terminal => {
                let now = Instant::now();
                self.prune(now);
                self.notices.push_back((now, notice.clone()));
                self.redraw();
            }
            OutputFormat::Html => self.write(&format!(
                "<div class=\"toast {}\">{}</div>\n",
                notice_class(notice.level),
                escape_html(&notice.text)
            )),
        }
    }

    fn has_focus(&self) -> bool {
        self.last_input
            .is_some_and(|at| at.elapsed() < self.focus_idle)
    }

    fn input_activity(&mut self) {
        self.last_input = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_follows_input() {
        let mut surface = StreamSurface::new(Vec::new(), OutputFormat::Terminal, Duration::from_secs(60));
        assert!(!surface.has_focus());
        surface.input_activity();
        assert!(surface.has_focus());

        let mut idle = StreamSurface::new(Vec::new(), OutputFormat::Terminal, Duration::ZERO);
        idle.input_activity();
        assert!(!idle.has_focus());
    }

    #[test]
    fn test_terminal_notice_is_drawn_under_frame() {
        let mut surface = StreamSurface::new(Vec::new(), OutputFormat::Terminal, Duration::ZERO);
        surface.present("FRAME");
        surface.show_notice(&Notice::error("Failed to join channel: \u{1b}[31mnope"));
        let out = String::from_utf8(surface.into_inner()).unwrap();
        let last = out.rsplit(CLEAR_SCREEN).next().unwrap();
        assert!(last.starts_with("FRAME\n"));
        assert!(last.contains("[error] Failed to join channel: \\u{1b}[31mnope"));
    }

    #[test]
    fn test_html_notice_is_escaped() {
        let mut surface = StreamSurface::new(Vec::new(), OutputFormat::Html, Duration::ZERO);
        surface.show_notice(&Notice::warning("<b>x</b>"));
        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert_eq!(out, "<div class=\"toast warning\">&lt;b&gt;x&lt;/b&gt;</div>\n");
    }
}
