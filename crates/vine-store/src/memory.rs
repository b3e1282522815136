use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard};

use vine_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object store holding everything in a process-local map.
///
/// Used by tests and by callers that do not need persistence. Nothing is
/// ever evicted.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> RwLockReadGuard<'_, HashMap<ObjectId, StoredObject>> {
        self.objects.read().expect("object map lock poisoned")
    }

    /// Number of distinct objects held.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.snapshot().get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        if !self.snapshot().contains_key(&id) {
            self.objects
                .write()
                .expect("object map lock poisoned")
                .insert(id, object.clone());
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.snapshot().contains_key(id))
    }
}

impl fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, Indirection, Object, Tree};
    use proptest::prelude::*;

    #[test]
    fn every_kind_comes_back_as_written() {
        let store = InMemoryObjectStore::new();
        let blob = store.put_blob(b"file body").unwrap();
        let tree = store.put_tree(&Tree::new([("f".to_string(), blob)])).unwrap();
        let alias = store.put(&Indirection::new(tree).into()).unwrap();

        assert_eq!(store.get(&blob).unwrap(), Blob::new(b"file body".to_vec()).into());
        match store.get(&tree).unwrap() {
            Object::Tree(t) => assert_eq!(t.get("f"), Some(blob)),
            other => panic!("expected tree, got {other:?}"),
        }
        assert_eq!(store.get(&alias).unwrap(), Indirection::new(tree).into());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::digest(b"never stored");
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.exists(&id).unwrap());
        assert!(matches!(store.get(&id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn shared_content_is_kept_once() {
        let store = InMemoryObjectStore::new();
        assert!(store.is_empty());
        let first = store.put_blob(b"dup").unwrap();
        let second = store.put_blob(b"dup").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn kind_is_part_of_identity() {
        let store = InMemoryObjectStore::new();
        let empty_file = store.put_blob(b"").unwrap();
        let empty_dir = store.put_tree(&Tree::empty()).unwrap();
        assert_ne!(empty_file, empty_dir);
    }

    proptest! {
        #[test]
        fn blob_content_survives_storage(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let store = InMemoryObjectStore::new();
            let id = store.put_blob(&data).unwrap();
            prop_assert_eq!(store.get(&id).unwrap(), Object::Blob(Blob::new(data.clone())));
            prop_assert_eq!(store.put_blob(&data).unwrap(), id);
            prop_assert_eq!(store.len(), 1);
        }
    }
}
