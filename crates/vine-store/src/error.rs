use thiserror::Error;
use vine_types::ObjectId;

/// Errors from object stores and from encoding or decoding objects.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no object {0}")]
    NotFound(ObjectId),

    /// The bytes stored under `id` hash to `computed` instead.
    #[error("object {id} fails verification: content hashes to {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    #[error("cannot encode object: {0}")]
    Encode(String),

    #[error("object {id} cannot be decoded: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// An offset or size that cannot be addressed in memory.
    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("object content hashes to the null id")]
    NullObjectId,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
