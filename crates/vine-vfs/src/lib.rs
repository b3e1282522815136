//! Filesystem surface for Vine.
//!
//! The [`FileSystem`] dispatcher presents every branch under one root: the
//! root directory lists one entry per known user id, and everything below
//! `/<user id>/` is that user's branch. The [`Bridge`] exposes the dispatcher
//! to synchronous, blocking callers (a kernel filesystem driver, the CLI) by
//! running each call as a job on the tokio runtime and translating errors to
//! errno values.
//!
//! # Modules
//!
//! - [`config`] — [`VineConfig`], the on-disk layout and bridge settings
//! - [`dispatcher`] — [`FileSystem`], routing paths to branches
//! - [`bridge`] — [`Bridge`], the blocking call surface
//! - [`error`] — [`FsError`] and its errno mapping

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;

pub use bridge::Bridge;
pub use config::VineConfig;
pub use dispatcher::{split_path, FileSystem};
pub use error::{FsError, FsResult};
pub use vine_branch::Attr;
pub use vine_merge::{EntryKind, MergedEntry};
