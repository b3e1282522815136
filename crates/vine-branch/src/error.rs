use thiserror::Error;
use vine_refs::RefError;
use vine_store::StoreError;

/// Errors from branch operations.
#[derive(Debug, Error)]
pub enum BranchError {
    /// A path component does not exist.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// The path has the wrong shape (a file used as a directory, an illegal
    /// name, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs a file but found a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// A directory to be removed still has entries.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// The entry to be created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The branch's object graph is not in the shape it must be.
    #[error("corrupt branch state: {0}")]
    Corrupt(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("root store error: {0}")]
    Ref(#[from] RefError),

    /// The blocking task persisting a commit panicked or was cancelled.
    #[error("commit task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type BranchResult<T> = Result<T, BranchError>;
