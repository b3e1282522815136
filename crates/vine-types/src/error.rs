use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
