//! In-memory root store for testing and ephemeral use.

use std::collections::BTreeMap;
use std::sync::RwLock;

use vine_types::{UserId, VersionedObject};

use crate::error::Result;
use crate::traits::RootStore;

/// An in-memory implementation of [`RootStore`].
///
/// All data lives in a `BTreeMap` behind a `RwLock`. Data is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRootStore {
    roots: RwLock<BTreeMap<UserId, VersionedObject>>,
}

impl InMemoryRootStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RootStore for InMemoryRootStore {
    fn read_root(&self, user: &UserId) -> Result<Option<VersionedObject>> {
        Ok(self.roots.read().expect("root map lock poisoned").get(user).cloned())
    }

    fn write_root(&self, user: &UserId, root: &VersionedObject) -> Result<()> {
        self.roots
            .write()
            .expect("root map lock poisoned")
            .insert(*user, root.clone());
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<UserId>> {
        Ok(self
            .roots
            .read()
            .expect("root map lock poisoned")
            .keys()
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vine_types::{ObjectId, VersionVector};

    fn user(n: u8) -> UserId {
        UserId::from_bytes([n; 16])
    }

    fn root(tag: &[u8], count: u64) -> VersionedObject {
        VersionedObject::new(
            ObjectId::digest(tag),
            [(user(1), count)].into_iter().collect::<VersionVector>(),
        )
    }

    #[test]
    fn unknown_user_has_no_root() {
        let store = InMemoryRootStore::new();
        assert!(store.read_root(&user(1)).unwrap().is_none());
        assert!(store.list_users().unwrap().is_empty());
    }

    #[test]
    fn write_then_read() {
        let store = InMemoryRootStore::new();
        store.write_root(&user(1), &root(b"r1", 1)).unwrap();
        assert_eq!(store.read_root(&user(1)).unwrap(), Some(root(b"r1", 1)));
    }

    #[test]
    fn write_replaces_previous_root() {
        let store = InMemoryRootStore::new();
        store.write_root(&user(1), &root(b"r1", 1)).unwrap();
        store.write_root(&user(1), &root(b"r2", 2)).unwrap();
        assert_eq!(store.read_root(&user(1)).unwrap(), Some(root(b"r2", 2)));
    }

    #[test]
    fn users_listed_in_order() {
        let store = InMemoryRootStore::new();
        store.write_root(&user(3), &root(b"c", 1)).unwrap();
        store.write_root(&user(1), &root(b"a", 1)).unwrap();
        assert_eq!(store.list_users().unwrap(), vec![user(1), user(3)]);
    }
}
