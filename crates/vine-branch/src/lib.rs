//! Per-user versioned directory trees.
//!
//! A [`Branch`] is one user's view of the filesystem: a root tree in the
//! shared object store plus the version vector recording how far every user's
//! changes are reflected in it. Every mutation rewrites the path from the
//! changed entry up to the root (copy-on-write) and advances the owner's
//! version counter once. Mutations of one branch are serialized.

pub mod branch;
pub mod error;
pub mod path;

pub use branch::{Attr, Branch};
pub use error::{BranchError, BranchResult};
pub use path::{display_path, validate_name};
