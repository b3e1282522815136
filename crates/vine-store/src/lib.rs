//! Content-addressed object storage for Vine.
//!
//! Every directory tree and file a branch holds is stored as an immutable
//! object identified by its BLAKE3 hash (domain-separated by object kind).
//! A mutation never changes an object in place; it writes new objects and
//! leaves unchanged subtrees shared between the old and new roots.
//!
//! # Object Types
//!
//! - [`Blob`] -- file contents
//! - [`Tree`] -- directory listing mapping names to object ids
//! - [`Indirection`] -- an alias pointing at another object id
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`DiskObjectStore`] -- one file per object under a fan-out directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writing identical content twice returns the same id and stores one copy.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use disk::DiskObjectStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, MAX_BLOB_SIZE, Indirection, Object, ObjectKind, StoredObject, Tree};
pub use traits::ObjectStore;
