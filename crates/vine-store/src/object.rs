use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vine_crypto::ContentHasher;
use vine_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// File contents.
    Blob,
    /// Directory listing: entries ordered by name.
    Tree,
    /// Alias for another object.
    Indirection,
}

impl ObjectKind {
    /// The tag written in front of the payload by on-disk backends.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Indirection => "id",
        }
    }

    /// Parse a tag produced by [`ObjectKind::tag`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "id" => Some(Self::Indirection),
            _ => None,
        }
    }

    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
            Self::Indirection => &ContentHasher::INDIRECTION,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A stored object: kind tag + encoded data + cached size.
///
/// `StoredObject` is the unit of storage. Backends never interpret `data`;
/// they only key it by [`StoredObject::compute_id`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Largest blob a write or truncate may produce: 1 GiB.
pub const MAX_BLOB_SIZE: u64 = 1 << 30;

/// File contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy up to `size` bytes starting at `offset`. Reading at or past the
    /// end yields an empty slice.
    pub fn read_at(&self, size: usize, offset: u64) -> &[u8] {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.data.len());
        let end = start.saturating_add(size).min(self.data.len());
        &self.data[start..end]
    }

    /// Overwrite `bytes` at `offset`, growing the blob and zero-filling any
    /// gap between the old end and `offset`. An empty write changes nothing.
    pub fn write_at(&mut self, bytes: &[u8], offset: u64) -> StoreResult<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(bytes.len() as u64)
            .filter(|end| *end <= MAX_BLOB_SIZE)
            .ok_or_else(|| {
                StoreError::OutOfRange(format!(
                    "write of {} bytes at {offset} exceeds {MAX_BLOB_SIZE} bytes",
                    bytes.len()
                ))
            })?;
        let (start, end) = (offset as usize, end as usize);
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Resize to exactly `size` bytes, cutting or zero-padding.
    pub fn truncate(&mut self, size: u64) -> StoreResult<()> {
        if size > MAX_BLOB_SIZE {
            return Err(StoreError::OutOfRange(format!(
                "size {size} exceeds {MAX_BLOB_SIZE} bytes"
            )));
        }
        self.data.resize(size as usize, 0);
        Ok(())
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Directory listing: a name-ordered map from entry name to child id.
///
/// The child may be any object kind. Entry names are unique per tree and the
/// `BTreeMap` keeps the encoding (and therefore the hash) deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    entries: BTreeMap<String, ObjectId>,
}

impl Tree {
    pub fn new(entries: impl IntoIterator<Item = (String, ObjectId)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.entries.get(name).copied()
    }

    /// Insert or replace an entry, returning the previous child id.
    pub fn insert(&mut self, name: impl Into<String>, id: ObjectId) -> Option<ObjectId> {
        self.entries.insert(name.into(), id)
    }

    pub fn remove(&mut self, name: &str) -> Option<ObjectId> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }
}

// ---------------------------------------------------------------------------
// Indirection
// ---------------------------------------------------------------------------

/// An alias whose payload is another object id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indirection {
    pub target: ObjectId,
}

impl Indirection {
    pub fn new(target: ObjectId) -> Self {
        Self { target }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Indirection, self.target.as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// A decoded object of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Indirection(Indirection),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Indirection(_) => ObjectKind::Indirection,
        }
    }

    /// Encode for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        match self {
            Self::Blob(blob) => Ok(blob.to_stored_object()),
            Self::Tree(tree) => tree.to_stored_object(),
            Self::Indirection(ind) => Ok(ind.to_stored_object()),
        }
    }

    /// The id this object would be stored under.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Decode a stored object.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        match obj.kind {
            ObjectKind::Blob => Ok(Self::Blob(Blob::new(obj.data.clone()))),
            ObjectKind::Tree => serde_json::from_slice(&obj.data)
                .map(Self::Tree)
                .map_err(|e| StoreError::CorruptObject {
                    id: obj.compute_id(),
                    reason: format!("undecodable tree: {e}"),
                }),
            ObjectKind::Indirection => {
                let target: [u8; 32] =
                    obj.data
                        .as_slice()
                        .try_into()
                        .map_err(|_| StoreError::CorruptObject {
                            id: obj.compute_id(),
                            reason: format!("indirection payload is {} bytes", obj.data.len()),
                        })?;
                Ok(Self::Indirection(Indirection::new(ObjectId::from_hash(target))))
            }
        }
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Indirection> for Object {
    fn from(ind: Indirection) -> Self {
        Self::Indirection(ind)
    }
}
