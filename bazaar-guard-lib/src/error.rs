use thiserror::Error;

/// Errors that can occur in the guard
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("User id must not be empty")]
    MissingUserId,

    #[error("Invalid action type: {0:?}")]
    InvalidActionType(String),

    #[error("Remote quota check failed: {0}")]
    Remote(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
