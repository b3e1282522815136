//! Error types for the merge engine.

use vine_store::StoreError;
use vine_types::UserId;

/// Errors that can occur while merging directory versions.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// No version exposes the requested entry.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A file was requested but every version holds a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Several versions differ in content and none causally dominates.
    #[error("conflicting versions of {name:?} held by {users:?}")]
    Conflict {
        /// The contested entry.
        name: String,
        /// Users holding a candidate version, in user order.
        users: Vec<UserId>,
    },

    /// A version does not point at the kind of object it must.
    #[error("corrupt version: {0}")]
    Corrupt(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
