use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Identity of a branch owner.
///
/// Every user/device that writes to a Vine filesystem has exactly one
/// `UserId`, and every branch is keyed by the `UserId` of its owner. The
/// canonical string form is the hyphenated UUID, which is also the name the
/// branch appears under at the filesystem root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh, globally unique identity.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an identity from raw bytes. Intended for tests and fixtures.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse the canonical string form. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::try_parse(s).ok().map(Self)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }

    /// Load the identity stored at `path`, or create and store a new one.
    ///
    /// Parent directories are created as needed. A file that exists but does
    /// not hold a valid identity is an error rather than silently replaced,
    /// since replacing it would orphan the branch owned by the old identity.
    pub fn load_or_create(path: &Path) -> Result<Self, TypeError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                Self::parse(trimmed).ok_or_else(|| TypeError::InvalidUserId(trimmed.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let id = Self::generate();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, format!("{id}\n"))?;
                Ok(id)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl FromStr for UserId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TypeError::InvalidUserId(s.to_string()))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.short_id())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
