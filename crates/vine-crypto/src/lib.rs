//! Content hashing for Vine.
//!
//! Every object stored by Vine is identified by a domain-separated BLAKE3
//! hash of its encoded bytes. The domain tag differs per object kind so a
//! blob and a tree with identical bytes never share an id.

pub mod hasher;

pub use hasher::ContentHasher;
