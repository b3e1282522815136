//! The per-path set of branch versions and the selection policy over it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use vine_store::{Object, ObjectStore, Tree};
use vine_types::{ObjectId, UserId, VersionedObject};

use crate::error::{MergeError, MergeResult};

/// Upper bound on consecutive indirections followed while resolving an entry.
const MAX_INDIRECTIONS: usize = 32;

/// One user's version of an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub user: UserId,
    pub version: VersionedObject,
}

/// What a merged name refers to across the versions exposing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// A directory in some versions and a file in others.
    Mixed,
}

/// A name in a merged listing together with the users exposing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedEntry {
    pub name: String,
    pub kind: EntryKind,
    pub users: Vec<UserId>,
}

/// The versions different branches hold for one logical directory.
///
/// Each [`VersionedObject`] points at a tree and carries the version vector
/// of the branch root it was reached from. A `MultiDir` is built on demand,
/// never persisted, and shares nothing mutable with the branches.
#[derive(Clone)]
pub struct MultiDir {
    versions: BTreeMap<UserId, VersionedObject>,
    store: Arc<dyn ObjectStore>,
}

impl fmt::Debug for MultiDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiDir")
            .field("versions", &self.versions)
            .finish_non_exhaustive()
    }
}

/// A child entry as seen by one version.
struct Child {
    user: UserId,
    id: ObjectId,
    object: Object,
    parent: VersionedObject,
}

impl MultiDir {
    pub fn new(versions: BTreeMap<UserId, VersionedObject>, store: Arc<dyn ObjectStore>) -> Self {
        Self { versions, store }
    }

    pub fn versions(&self) -> &BTreeMap<UserId, VersionedObject> {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Union of entry names across every version.
    pub fn list(&self) -> MergeResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for (user, version) in &self.versions {
            let tree = self.tree_of(user, version)?;
            names.extend(tree.iter().map(|(name, _)| name.to_string()));
        }
        Ok(names)
    }

    /// Merged listing with the kind of each name and the users exposing it.
    pub fn entries(&self) -> MergeResult<Vec<MergedEntry>> {
        let mut merged: BTreeMap<String, (Option<EntryKind>, Vec<UserId>)> = BTreeMap::new();
        for (user, version) in &self.versions {
            let tree = self.tree_of(user, version)?;
            for (name, id) in tree.iter() {
                let kind = match self.resolve(id)?.1 {
                    Object::Tree(_) => EntryKind::Directory,
                    _ => EntryKind::File,
                };
                let slot = merged.entry(name.to_string()).or_default();
                slot.0 = match slot.0 {
                    None => Some(kind),
                    Some(seen) if seen == kind => Some(seen),
                    Some(_) => Some(EntryKind::Mixed),
                };
                slot.1.push(*user);
            }
        }

        Ok(merged
            .into_iter()
            .map(|(name, (kind, users))| MergedEntry {
                name,
                kind: kind.unwrap_or(EntryKind::File),
                users,
            })
            .collect())
    }

    /// Descend into subdirectory `name`.
    ///
    /// Versions lacking `name`, or holding it as a file, are dropped. Fails
    /// with [`MergeError::NotFound`] if no version remains.
    pub fn cd_into(&self, name: &str) -> MergeResult<MultiDir> {
        let versions: BTreeMap<UserId, VersionedObject> = self
            .children(name)?
            .into_iter()
            .filter(|child| matches!(child.object, Object::Tree(_)))
            .map(|child| (child.user, child.parent.with_object(child.id)))
            .collect();

        if versions.is_empty() {
            return Err(MergeError::NotFound(name.to_string()));
        }
        Ok(Self::new(versions, self.store.clone()))
    }

    /// [`cd_into`](Self::cd_into) each component of `path` in turn.
    pub fn cd_into_path<S: AsRef<str>>(&self, path: &[S]) -> MergeResult<MultiDir> {
        path.iter()
            .try_fold(self.clone(), |dir, name| dir.cd_into(name.as_ref()))
    }

    /// The content id of file `name` across the versions exposing it.
    ///
    /// Versions agreeing on the content give that content. Otherwise the
    /// version whose vector dominates every other one wins, and if there is
    /// none the result is a [`MergeError::Conflict`].
    pub fn file(&self, name: &str) -> MergeResult<ObjectId> {
        let children = self.children(name)?;
        if children.is_empty() {
            return Err(MergeError::NotFound(name.to_string()));
        }

        let files: Vec<Version> = children
            .into_iter()
            .filter(|child| !matches!(child.object, Object::Tree(_)))
            .map(|child| Version {
                user: child.user,
                version: child.parent.with_object(child.id),
            })
            .collect();
        if files.is_empty() {
            return Err(MergeError::IsADirectory(name.to_string()));
        }

        Ok(select(name, files)?.version.object_id)
    }

    /// Choose the version of subdirectory `name` a new edit by `preferred`
    /// should extend.
    ///
    /// The preferred user's own version always wins, so edits extend the
    /// editor's causal history. Without one, the single foreign version (or
    /// the one dominating all the others) is the fork point. Returns `None`
    /// when no version holds `name` as a directory.
    pub fn pick_subdirectory_to_edit(
        &self,
        preferred: UserId,
        name: &str,
    ) -> MergeResult<Option<Version>> {
        let candidates: Vec<Version> = self
            .children(name)?
            .into_iter()
            .filter(|child| matches!(child.object, Object::Tree(_)))
            .map(|child| Version {
                user: child.user,
                version: child.parent.with_object(child.id),
            })
            .collect();

        if candidates.is_empty() {
            return Ok(None);
        }
        if let Some(own) = candidates.iter().find(|c| c.user == preferred) {
            return Ok(Some(own.clone()));
        }

        let picked = select(name, candidates)?;
        debug!(%preferred, from = %picked.user, entry = name, "picked fork point");
        Ok(Some(picked))
    }

    fn children(&self, name: &str) -> MergeResult<Vec<Child>> {
        let mut children = Vec::new();
        for (user, version) in &self.versions {
            let tree = self.tree_of(user, version)?;
            if let Some(id) = tree.get(name) {
                let (id, object) = self.resolve(id)?;
                children.push(Child {
                    user: *user,
                    id,
                    object,
                    parent: version.clone(),
                });
            }
        }
        Ok(children)
    }

    fn tree_of(&self, user: &UserId, version: &VersionedObject) -> MergeResult<Tree> {
        match self.resolve(version.object_id)?.1 {
            Object::Tree(tree) => Ok(tree),
            other => Err(MergeError::Corrupt(format!(
                "version of {user} points at a {}",
                other.kind()
            ))),
        }
    }

    /// Load `id`, following indirections. Returns the final id and object.
    fn resolve(&self, id: ObjectId) -> MergeResult<(ObjectId, Object)> {
        let mut id = id;
        for _ in 0..MAX_INDIRECTIONS {
            match self.store.get(&id)? {
                Object::Indirection(ind) => id = ind.target,
                object => return Ok((id, object)),
            }
        }
        Err(MergeError::Corrupt(format!(
            "more than {MAX_INDIRECTIONS} indirections ending at {id}"
        )))
    }
}

/// Pick the first candidate (in user order) whose vector is at least every
/// other candidate's vector that holds different content.
fn select(name: &str, mut candidates: Vec<Version>) -> MergeResult<Version> {
    let winner = candidates.iter().position(|c| {
        candidates.iter().all(|other| {
            other.version.object_id == c.version.object_id
                || c.version.compare(&other.version).is_at_least()
        })
    });

    match winner {
        Some(index) => Ok(candidates.swap_remove(index)),
        None => {
            let users: Vec<UserId> = candidates.iter().map(|c| c.user).collect();
            warn!(entry = name, ?users, "concurrent versions, no fork point");
            Err(MergeError::Conflict {
                name: name.to_string(),
                users,
            })
        }
    }
}
