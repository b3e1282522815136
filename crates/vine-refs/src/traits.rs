//! The [`RootStore`] trait defining the root pointer storage interface.

use vine_types::{UserId, VersionedObject};

use crate::error::Result;

/// Storage backend for branch root pointers.
///
/// Implementations must be thread-safe (`Send + Sync`) and replace a root
/// atomically: a reader sees either the previous root or the new one.
pub trait RootStore: Send + Sync {
    /// Read the root pointer of `user`'s branch.
    ///
    /// Returns `Ok(None)` if the branch has never been persisted.
    fn read_root(&self, user: &UserId) -> Result<Option<VersionedObject>>;

    /// Create or replace the root pointer of `user`'s branch.
    fn write_root(&self, user: &UserId, root: &VersionedObject) -> Result<()>;

    /// Every user with a persisted root, in user order.
    fn list_users(&self) -> Result<Vec<UserId>>;
}
