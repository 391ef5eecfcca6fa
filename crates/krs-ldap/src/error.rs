use krs_keycloak::KeycloakError;
use thiserror::Error;

pub type LdapResult<T> = std::result::Result<T, LdapError>;

#[derive(Debug, Error)]
pub enum LdapError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server answered with a non-success result code
    #[error("LDAP error (rc {code}): {message}")]
    Operation { code: u32, message: String },

    #[error("user \"{0}\" does not exist")]
    NotFound(String),

    #[error("user \"{0}\" already exists")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Keycloak(#[from] KeycloakError),
}

impl LdapError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ldap3::LdapError> for LdapError {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => LdapError::Operation {
                code: result.rc,
                message: result.text,
            },
            other => LdapError::Connection(other.to_string()),
        }
    }
}
