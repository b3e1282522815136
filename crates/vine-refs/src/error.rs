//! Error types for root pointer operations.

use thiserror::Error;

/// Errors that can occur while reading or writing root pointers.
#[derive(Debug, Error)]
pub enum RefError {
    /// A persisted root pointer could not be decoded.
    #[error("corrupt root pointer {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for root pointer operations.
pub type Result<T> = std::result::Result<T, RefError>;
