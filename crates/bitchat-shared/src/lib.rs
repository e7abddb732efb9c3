// Data model, wire protocol and error taxonomy shared by the BitChat client crates.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{ClientError, ValidationError};
pub use types::{Channel, ConnectionStatus, ConversationMode, Message, ModeKind, Peer, UserInfo};
