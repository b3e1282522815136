use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info};
use vine_refs::RootStore;
use vine_store::{Blob, Object, ObjectStore, StoreError, Tree};
use vine_types::{ObjectId, UserId, VersionVector, VersionedObject};

use crate::error::{BranchError, BranchResult};
use crate::path::{display_path, validate_name};

/// Upper bound on consecutive indirections followed while resolving an entry.
const MAX_INDIRECTIONS: usize = 32;

/// What a path resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attr {
    Directory,
    File { size: u64 },
}

/// The new state of the edited entry in its parent tree.
enum Leaf {
    Put(ObjectId),
    Remove,
}

/// One user's versioned directory tree.
///
/// Reads work on a snapshot of the current root. Mutations are serialized by
/// `commit_lock`: each one reads the root, rebuilds the path from the edited
/// entry up to the root, persists the new root pointer and only then
/// publishes it, so a failed mutation leaves the branch untouched and two
/// concurrent mutations never overwrite each other's ancestor rewrites.
pub struct Branch {
    owner: UserId,
    store: Arc<dyn ObjectStore>,
    roots: Arc<dyn RootStore>,
    root: RwLock<VersionedObject>,
    commit_lock: Mutex<()>,
}

impl std::fmt::Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("owner", &self.owner)
            .field("root", &self.root())
            .finish()
    }
}

impl Branch {
    /// Load `owner`'s branch from its persisted root pointer, or create it
    /// with an empty root tree and an all-zero version vector.
    pub fn load_or_create(
        owner: UserId,
        store: Arc<dyn ObjectStore>,
        roots: Arc<dyn RootStore>,
    ) -> BranchResult<Self> {
        let root = match roots.read_root(&owner)? {
            Some(root) => {
                info!(%owner, root = %root.object_id.short_hex(), "loaded branch");
                root
            }
            None => {
                let empty = store.put_tree(&Tree::empty())?;
                let root = VersionedObject::new(empty, VersionVector::new());
                roots.write_root(&owner, &root)?;
                info!(%owner, "created branch");
                root
            }
        };

        Ok(Self {
            owner,
            store,
            roots,
            root: RwLock::new(root),
            commit_lock: Mutex::new(()),
        })
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Snapshot of the current root.
    pub fn root(&self) -> VersionedObject {
        self.root.read().expect("branch root lock poisoned").clone()
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub async fn get_attr<S: AsRef<str>>(&self, path: &[S]) -> BranchResult<Attr> {
        let path = components(path)?;
        match self.resolve(&path)? {
            Object::Tree(_) => Ok(Attr::Directory),
            Object::Blob(blob) => Ok(Attr::File { size: blob.len() }),
            Object::Indirection(_) => Err(unresolved(&path)),
        }
    }

    /// Entries of the directory at `path` as `(name, child id)` pairs.
    pub async fn readdir<S: AsRef<str>>(&self, path: &[S]) -> BranchResult<Vec<(String, ObjectId)>> {
        let path = components(path)?;
        let tree = self.walk(self.root_tree(&self.root())?, &path)?;
        Ok(tree.iter().map(|(name, id)| (name.to_string(), id)).collect())
    }

    /// Read up to `size` bytes at `offset`. Past the end yields nothing.
    pub async fn read<S: AsRef<str>>(
        &self,
        path: &[S],
        size: usize,
        offset: u64,
    ) -> BranchResult<Vec<u8>> {
        let path = components(path)?;
        match self.resolve(&path)? {
            Object::Blob(blob) => Ok(blob.read_at(size, offset).to_vec()),
            Object::Tree(_) => Err(BranchError::IsADirectory(display_path(&path))),
            Object::Indirection(_) => Err(unresolved(&path)),
        }
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Write `bytes` at `offset`, creating the file if it does not exist.
    pub async fn write<S: AsRef<str>>(
        &self,
        path: &[S],
        bytes: &[u8],
        offset: u64,
    ) -> BranchResult<usize> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::IsADirectory(display_path(&path)));
        }
        self.commit(&path, None, |current| {
            let mut blob = match current {
                None => Blob::default(),
                Some(Object::Blob(blob)) => blob,
                Some(_) => return Err(BranchError::IsADirectory(display_path(&path))),
            };
            let written = blob.write_at(bytes, offset).map_err(range_error)?;
            Ok((Leaf::Put(self.store.put(&blob.into())?), written))
        })
        .await
    }

    /// Create or replace the entry at `path` with `object`.
    pub async fn store<S: AsRef<str>>(&self, path: &[S], object: Object) -> BranchResult<ObjectId> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::IsADirectory(display_path(&path)));
        }
        self.commit(&path, None, |current| {
            if let Some(Object::Tree(_)) = current {
                return Err(BranchError::IsADirectory(display_path(&path)));
            }
            let id = self.store.put(&object)?;
            Ok((Leaf::Put(id), id))
        })
        .await
    }

    pub async fn mkdir<S: AsRef<str>>(&self, path: &[S]) -> BranchResult<()> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::AlreadyExists(display_path(&path)));
        }
        self.commit(&path, None, |current| {
            if current.is_some() {
                return Err(BranchError::AlreadyExists(display_path(&path)));
            }
            Ok((Leaf::Put(self.store.put_tree(&Tree::empty())?), ()))
        })
        .await
    }

    /// Remove a file.
    pub async fn remove<S: AsRef<str>>(&self, path: &[S]) -> BranchResult<()> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::IsADirectory(display_path(&path)));
        }
        self.commit(&path, None, |current| match current {
            None => Err(BranchError::NotFound(display_path(&path))),
            Some(Object::Tree(_)) => Err(BranchError::IsADirectory(display_path(&path))),
            Some(_) => Ok((Leaf::Remove, ())),
        })
        .await
    }

    /// Remove an empty directory.
    pub async fn rmdir<S: AsRef<str>>(&self, path: &[S]) -> BranchResult<()> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::InvalidArgument(
                "the branch root cannot be removed".into(),
            ));
        }
        self.commit(&path, None, |current| match current {
            None => Err(BranchError::NotFound(display_path(&path))),
            Some(Object::Tree(tree)) if !tree.is_empty() => {
                Err(BranchError::NotEmpty(display_path(&path)))
            }
            Some(Object::Tree(_)) => Ok((Leaf::Remove, ())),
            Some(_) => Err(BranchError::InvalidArgument(format!(
                "{} is not a directory",
                display_path(&path)
            ))),
        })
        .await
    }

    /// Resize a file to exactly `size` bytes, zero-padding when it grows.
    pub async fn truncate<S: AsRef<str>>(&self, path: &[S], size: u64) -> BranchResult<u64> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::IsADirectory(display_path(&path)));
        }
        self.commit(&path, None, |current| {
            let mut blob = match current {
                None => return Err(BranchError::NotFound(display_path(&path))),
                Some(Object::Blob(blob)) => blob,
                Some(_) => return Err(BranchError::IsADirectory(display_path(&path))),
            };
            blob.truncate(size).map_err(range_error)?;
            Ok((Leaf::Put(self.store.put(&blob.into())?), size))
        })
        .await
    }

    /// Install a subtree taken from another branch at `path`.
    ///
    /// The foreign version vector is merged into this branch's root vector
    /// before the owner entry is advanced, so the new root causally follows
    /// both this branch's previous root and the imported version.
    pub async fn graft<S: AsRef<str>>(&self, path: &[S], version: &VersionedObject) -> BranchResult<()> {
        let path = components(path)?;
        if path.is_empty() {
            return Err(BranchError::AlreadyExists(display_path(&path)));
        }
        self.commit(&path, Some(&version.versions), |current| {
            if current.is_some() {
                return Err(BranchError::AlreadyExists(display_path(&path)));
            }
            if !self.store.exists(&version.object_id)? {
                return Err(BranchError::NotFound(format!(
                    "object {} for {}",
                    version.object_id,
                    display_path(&path)
                )));
            }
            Ok((Leaf::Put(version.object_id), ()))
        })
        .await?;
        info!(owner = %self.owner, path = %display_path(&path), "grafted foreign subtree");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    /// Load an object, following indirections to the final target.
    fn load(&self, id: ObjectId) -> BranchResult<Object> {
        let mut id = id;
        for _ in 0..MAX_INDIRECTIONS {
            match self.store.get(&id)? {
                Object::Indirection(ind) => id = ind.target,
                object => return Ok(object),
            }
        }
        Err(BranchError::Corrupt(format!(
            "more than {MAX_INDIRECTIONS} indirections ending at {id}"
        )))
    }

    fn root_tree(&self, root: &VersionedObject) -> BranchResult<Tree> {
        match self.load(root.object_id)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(BranchError::Corrupt(format!(
                "root of branch {} is a {}",
                self.owner,
                other.kind()
            ))),
        }
    }

    /// Descend from `tree` through `path`; every component must be a tree.
    fn walk(&self, mut tree: Tree, path: &[&str]) -> BranchResult<Tree> {
        for depth in 0..path.len() {
            let here = &path[..=depth];
            let child = tree
                .get(path[depth])
                .ok_or_else(|| BranchError::NotFound(display_path(here)))?;
            match self.load(child)? {
                Object::Tree(sub) => tree = sub,
                _ => {
                    return Err(BranchError::InvalidArgument(format!(
                        "{} is not a directory",
                        display_path(here)
                    )))
                }
            }
        }
        Ok(tree)
    }

    fn resolve(&self, path: &[&str]) -> BranchResult<Object> {
        let root = self.root_tree(&self.root())?;
        let Some((name, parents)) = path.split_last() else {
            return Ok(Object::Tree(root));
        };
        let parent = self.walk(root, parents)?;
        let child = parent
            .get(name)
            .ok_or_else(|| BranchError::NotFound(display_path(path)))?;
        self.load(child)
    }

    /// Apply `edit` to the entry at `path` and commit the rewritten chain of
    /// ancestors as the new root.
    ///
    /// `edit` receives the current (indirection-resolved) entry, `None` when
    /// absent. The root version is advanced once for the whole operation,
    /// after merging `import` when given.
    async fn commit<T, F>(
        &self,
        path: &[&str],
        import: Option<&VersionVector>,
        edit: F,
    ) -> BranchResult<T>
    where
        F: FnOnce(Option<Object>) -> BranchResult<(Leaf, T)>,
    {
        let (leaf_name, parents) = path
            .split_last()
            .ok_or_else(|| BranchError::InvalidArgument("empty path".into()))?;

        let _guard = self.commit_lock.lock().await;
        let base = self.root();

        let mut chain: Vec<(Tree, &str)> = Vec::with_capacity(parents.len());
        let mut tree = self.root_tree(&base)?;
        for (depth, name) in parents.iter().enumerate() {
            let here = &path[..=depth];
            let child = tree
                .get(name)
                .ok_or_else(|| BranchError::NotFound(display_path(here)))?;
            let Object::Tree(sub) = self.load(child)? else {
                return Err(BranchError::InvalidArgument(format!(
                    "{} is not a directory",
                    display_path(here)
                )));
            };
            chain.push((tree, *name));
            tree = sub;
        }

        let current = match tree.get(leaf_name) {
            Some(id) => Some(self.load(id)?),
            None => None,
        };
        let (leaf, output) = edit(current)?;
        match leaf {
            Leaf::Put(id) => {
                tree.insert(*leaf_name, id);
            }
            Leaf::Remove => {
                tree.remove(leaf_name);
            }
        }

        let mut next = base;
        if let Some(foreign) = import {
            next.versions.merge(foreign);
        }
        let chain: Vec<(Tree, String)> = chain
            .into_iter()
            .map(|(parent, name)| (parent, name.to_string()))
            .collect();
        let next = self.persist(tree, chain, next).await?;
        let id = next.object_id;
        *self.root.write().expect("branch root lock poisoned") = next.clone();

        debug!(
            owner = %self.owner,
            path = %display_path(path),
            root = %id.short_hex(),
            version = next.versions.get(&self.owner),
            "committed branch root"
        );
        Ok(output)
    }

    /// Write the rebuilt trees bottom-up and the advanced root pointer.
    ///
    /// Runs on the blocking pool: disk backends fsync every object, and the
    /// commit lock is held throughout, so this must not occupy a runtime
    /// worker.
    async fn persist(
        &self,
        leaf_parent: Tree,
        mut chain: Vec<(Tree, String)>,
        base: VersionedObject,
    ) -> BranchResult<VersionedObject> {
        let store = self.store.clone();
        let roots = self.roots.clone();
        let owner = self.owner;
        tokio::task::spawn_blocking(move || -> BranchResult<VersionedObject> {
            let mut id = store.put_tree(&leaf_parent)?;
            while let Some((mut parent, name)) = chain.pop() {
                parent.insert(name, id);
                id = store.put_tree(&parent)?;
            }
            let next = base.advance(owner, id);
            roots.write_root(&owner, &next)?;
            Ok(next)
        })
        .await?
    }
}

/// Validate and borrow path components.
fn components<S: AsRef<str>>(path: &[S]) -> BranchResult<Vec<&str>> {
    path.iter()
        .map(|component| {
            let name = component.as_ref();
            validate_name(name).map(|()| name)
        })
        .collect()
}

/// Offsets and sizes come from callers, so ranges that cannot be addressed
/// are their mistake rather than broken state.
fn range_error(err: StoreError) -> BranchError {
    match err {
        StoreError::OutOfRange(msg) => BranchError::InvalidArgument(msg),
        other => other.into(),
    }
}

fn unresolved(path: &[&str]) -> BranchError {
    BranchError::Corrupt(format!("unresolved indirection at {}", display_path(path)))
}
