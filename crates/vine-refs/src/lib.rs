//! Branch root pointers for Vine.
//!
//! Each branch is identified by the [`UserId`](vine_types::UserId) of its
//! owner and persisted as a single root pointer: the
//! [`VersionedObject`](vine_types::VersionedObject) naming the branch's
//! current root tree and its version vector. Everything else a branch holds
//! is reachable from that root through the object store.
//!
//! # Modules
//!
//! - [`error`] — Error types for root pointer operations
//! - [`traits`] — The [`RootStore`] trait defining the storage interface
//! - [`memory`] — In-memory [`InMemoryRootStore`] for tests
//! - [`file`] — [`FileRootStore`], one JSON file per user

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{RefError, Result};
pub use file::FileRootStore;
pub use memory::InMemoryRootStore;
pub use traits::RootStore;
