use thiserror::Error;

/// Errors from the message transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Acknowledgment failed: {0}")]
    Ack(String),

    #[error("Transport closed")]
    Closed,
}

/// Errors from starting the event listener
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener already started")]
    AlreadyStarted,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors from the remote group directory
///
/// The group cache passes these through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("{kind} \"{key}\" not found")]
    NotFound { kind: &'static str, key: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl DirectoryError {
    pub fn group_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "group",
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
