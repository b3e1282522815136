//! Foundation types for Vine.
//!
//! Vine presents a set of per-user, independently versioned directory trees
//! as one filesystem. This crate holds the identity and versioning types every
//! other Vine crate builds on.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash)
//! - [`UserId`] — Stable identity of a branch owner (one per user/device)
//! - [`VersionVector`] — Per-user counters used for causal comparison
//! - [`VersionedObject`] — An object id paired with the version vector it reflects
//! - [`CausalOrder`] — Result of comparing two version vectors

pub mod error;
pub mod identity;
pub mod object;
pub mod version;

pub use error::TypeError;
pub use identity::UserId;
pub use object::ObjectId;
pub use version::{CausalOrder, VersionVector, VersionedObject};
