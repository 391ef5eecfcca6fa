use thiserror::Error;

pub type AmqpResult<T> = std::result::Result<T, AmqpError>;

/// Errors from the RabbitMQ management API
#[derive(Debug, Error)]
pub enum AmqpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AmqpError {
    fn from(err: reqwest::Error) -> Self {
        AmqpError::Network(err.to_string())
    }
}
