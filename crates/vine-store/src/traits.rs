use vine_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Object, StoredObject, Tree};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written: the same data always produces the
///   same ID.
/// - Writing an object that already exists is a no-op returning its ID.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read and decode an object, failing with [`StoreError::NotFound`] when
    /// it is absent.
    fn get(&self, id: &ObjectId) -> StoreResult<Object> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Object::from_stored_object(&stored)
    }

    /// Encode and write an object.
    fn put(&self, object: &Object) -> StoreResult<ObjectId> {
        self.write(&object.to_stored_object()?)
    }

    /// Store file contents.
    fn put_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data.to_vec()).to_stored_object())
    }

    /// Store a directory listing.
    fn put_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }
}
