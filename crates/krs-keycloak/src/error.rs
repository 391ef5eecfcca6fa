use krs_core::DirectoryError;
use thiserror::Error;

pub type KeycloakResult<T> = std::result::Result<T, KeycloakError>;

#[derive(Debug, Error)]
pub enum KeycloakError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{kind} \"{key}\" does not exist")]
    NotFound { kind: &'static str, key: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KeycloakError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map a 404 from the admin API onto `NotFound`
    pub(crate) fn or_not_found(self, kind: &'static str, key: &str) -> Self {
        match self {
            Self::Api { status: 404, .. } => Self::not_found(kind, key),
            other => other,
        }
    }
}

impl From<reqwest::Error> for KeycloakError {
    fn from(err: reqwest::Error) -> Self {
        KeycloakError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for KeycloakError {
    fn from(err: serde_json::Error) -> Self {
        KeycloakError::Parse(err.to_string())
    }
}

impl From<KeycloakError> for DirectoryError {
    fn from(err: KeycloakError) -> Self {
        match err {
            KeycloakError::Network(message) => DirectoryError::Network(message),
            KeycloakError::Api { status, message } => DirectoryError::Api { status, message },
            KeycloakError::Parse(message) => DirectoryError::Parse(message),
            KeycloakError::NotFound { kind, key } => DirectoryError::NotFound { kind, key },
            KeycloakError::InvalidArgument(message) => DirectoryError::Api {
                status: 400,
                message,
            },
            KeycloakError::Config(message) => DirectoryError::Auth(message),
        }
    }
}
