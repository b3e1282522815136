//! Multi-writer directory merge for Vine.
//!
//! Several branches may hold their own version of the same logical
//! directory. A [`MultiDir`] gathers those versions for one path and answers
//! two questions about them: what names are visible across all of them, and
//! which version a new edit should be based on when the editing user has none
//! of their own.
//!
//! Selection among versions that neither agree on content nor causally
//! dominate one another is never guessed: it fails with
//! [`MergeError::Conflict`].

pub mod error;
pub mod multi_dir;

pub use error::{MergeError, MergeResult};
pub use multi_dir::{EntryKind, MergedEntry, MultiDir, Version};
