//! Rendering of [`ClientState`] into a presentable frame.
//!
//! A renderer is a pure function of the state: rendering the same state twice
//! yields identical output, and all user-controlled text passes through the
//! renderer's escaper.

pub mod html;
pub mod terminal;
pub mod view;

pub use html::HtmlRenderer;
pub use terminal::TerminalRenderer;
pub use view::View;

use crate::state::ClientState;

pub trait Renderer {
    type Output;

    fn render(&self, state: &ClientState) -> Self::Output;
}
