use thiserror::Error;
use vine_branch::BranchError;
use vine_merge::MergeError;
use vine_refs::RefError;
use vine_store::StoreError;
use vine_types::TypeError;

/// Errors surfaced by the filesystem.
///
/// The first group are conditions a filesystem caller is expected to handle
/// and map to errno values. The rest mean the stored state or its backing
/// storage is broken; they have no errno and the bridge treats them as fatal.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("operation not permitted: {0}")]
    PermissionDenied(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Branches hold concurrent versions and none can be chosen.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt filesystem state: {0}")]
    Corrupt(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("root store error: {0}")]
    Ref(#[from] RefError),

    #[error("identity error: {0}")]
    Identity(#[from] TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// The errno for recoverable errors, `None` for everything else.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::NotFound(_) => Some(libc::ENOENT),
            Self::InvalidArgument(_) => Some(libc::EINVAL),
            Self::IsADirectory(_) => Some(libc::EISDIR),
            Self::PermissionDenied(_) => Some(libc::EPERM),
            Self::NotEmpty(_) => Some(libc::ENOTEMPTY),
            Self::AlreadyExists(_) => Some(libc::EEXIST),
            Self::Conflict(_) => Some(libc::EIO),
            _ => None,
        }
    }
}

impl From<BranchError> for FsError {
    fn from(err: BranchError) -> Self {
        match err {
            BranchError::NotFound(p) => Self::NotFound(p),
            BranchError::InvalidArgument(p) => Self::InvalidArgument(p),
            BranchError::IsADirectory(p) => Self::IsADirectory(p),
            BranchError::NotEmpty(p) => Self::NotEmpty(p),
            BranchError::AlreadyExists(p) => Self::AlreadyExists(p),
            BranchError::Corrupt(msg) => Self::Corrupt(msg),
            BranchError::Store(e) => Self::Store(e),
            BranchError::Ref(e) => Self::Ref(e),
            BranchError::Task(e) => Self::Corrupt(e.to_string()),
        }
    }
}

impl From<MergeError> for FsError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::NotFound(p) => Self::NotFound(p),
            MergeError::IsADirectory(p) => Self::IsADirectory(p),
            e @ MergeError::Conflict { .. } => Self::Conflict(e.to_string()),
            MergeError::Corrupt(msg) => Self::Corrupt(msg),
            MergeError::Store(e) => Self::Store(e),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
