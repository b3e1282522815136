//! File-backed root store: `<dir>/<user id>.json` per branch.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vine_types::{UserId, VersionedObject};

use crate::error::{RefError, Result};
use crate::traits::RootStore;

const EXTENSION: &str = "json";

/// Persists each branch root as a small JSON document.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the previous root, so a crash mid-write leaves the old root intact.
#[derive(Debug)]
pub struct FileRootStore {
    dir: PathBuf,
}

impl FileRootStore {
    /// Open (creating if needed) a root store in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user: &UserId) -> PathBuf {
        self.dir.join(format!("{user}.{EXTENSION}"))
    }
}

impl RootStore for FileRootStore {
    fn read_root(&self, user: &UserId) -> Result<Option<VersionedObject>> {
        let raw = match fs::read(self.path_for(user)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| RefError::Corrupt {
                name: user.to_string(),
                reason: e.to_string(),
            })
    }

    fn write_root(&self, user: &UserId, root: &VersionedObject) -> Result<()> {
        let data =
            serde_json::to_vec_pretty(root).map_err(|e| RefError::Serialization(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(user)).map_err(|e| RefError::Io(e.error))?;

        debug!(%user, root = %root.object_id.short_hex(), "persisted branch root");
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<UserId>> {
        let mut users = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match UserId::parse(stem) {
                Some(user) => users.push(user),
                None => warn!(path = %path.display(), "ignoring root file with malformed user id"),
            }
        }
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vine_types::{ObjectId, VersionVector};

    fn user(n: u8) -> UserId {
        UserId::from_bytes([n; 16])
    }

    fn root(tag: &[u8]) -> VersionedObject {
        VersionedObject::new(
            ObjectId::digest(tag),
            [(user(1), 4), (user(2), 1)].into_iter().collect::<VersionVector>(),
        )
    }

    #[test]
    fn roots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileRootStore::open(dir.path()).unwrap();
            store.write_root(&user(1), &root(b"one")).unwrap();
        }
        let store = FileRootStore::open(dir.path()).unwrap();
        assert_eq!(store.read_root(&user(1)).unwrap(), Some(root(b"one")));
        assert!(store.read_root(&user(2)).unwrap().is_none());
    }

    #[test]
    fn list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRootStore::open(dir.path()).unwrap();
        store.write_root(&user(2), &root(b"b")).unwrap();
        store.write_root(&user(1), &root(b"a")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        fs::write(dir.path().join("not-a-user.json"), b"{}").unwrap();

        assert_eq!(store.list_users().unwrap(), vec![user(1), user(2)]);
    }

    #[test]
    fn corrupt_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRootStore::open(dir.path()).unwrap();
        fs::write(store.path_for(&user(1)), b"{ nope").unwrap();

        let err = store.read_root(&user(1)).unwrap_err();
        assert!(matches!(err, RefError::Corrupt { .. }));
    }
}
