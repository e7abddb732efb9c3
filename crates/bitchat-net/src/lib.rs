// Transport adapter for the BitChat backend: HTTP calls plus the Socket.IO push channel.

pub mod push;
pub mod retry;
pub mod socketio;
pub mod transport;

pub use push::PushChannel;
pub use retry::ReconnectPolicy;
pub use transport::{decode, interpret_response, ApiCall, HttpMethod, HttpTransport, Transport};
