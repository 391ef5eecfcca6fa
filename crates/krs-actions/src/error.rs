use thiserror::Error;

pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: String },

    #[error("no quota configured for {0}")]
    UnknownQuotaPath(String),
}
