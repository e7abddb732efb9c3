use thiserror::Error;

/// Every failure a client operation can report.
///
/// None of these are fatal: the event loop surfaces them as notices and keeps
/// running with its prior state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Input rejected locally; no request was issued.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Transport failure, no usable response.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a failure status.
    #[error("{reason}")]
    Api { status: u16, reason: String },

    /// The server answered successfully but the body could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message content is required")]
    EmptyContent,

    #[error("Message is too long: {len} characters (max {max})")]
    ContentTooLong { len: usize, max: usize },

    #[error("Recipient is required")]
    EmptyTarget,

    #[error("Channel name is required")]
    EmptyChannelName,

    #[error("Nickname is required")]
    EmptyNickname,

    #[error("Invalid nickname format")]
    InvalidNickname,

    #[error("Unknown conversation mode: {0}")]
    UnknownMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_server_reason() {
        let err = ClientError::Api {
            status: 400,
            reason: "Message content is required".into(),
        };
        assert_eq!(err.to_string(), "Message content is required");
    }

    #[test]
    fn test_validation_converts() {
        let err: ClientError = ValidationError::InvalidNickname.into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Invalid nickname format");
    }
}
