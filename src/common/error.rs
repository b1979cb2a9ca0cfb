use thiserror::Error;

/// Outcomes the core reports back to the request layer.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for ChatError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
