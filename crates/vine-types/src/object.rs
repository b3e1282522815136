use std::fmt;
use std::str::FromStr;

use hex::FromHex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Identity of a stored object: a 32-byte BLAKE3 digest of its content.
///
/// Equal ids mean equal content, so a file two branches both hold is stored
/// once. The string form is 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// All zeros. Never the id of a stored object.
    pub const ZERO: Self = Self([0; 32]);

    /// Plain BLAKE3 digest of `data`, without any domain tag.
    pub fn digest(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn is_null(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <[u8; 32]>::from_hex(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidHex(format!("{s:?}: {e}")))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.short_hex()).finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_only_on_content() {
        assert_eq!(ObjectId::digest(b"same"), ObjectId::digest(b"same"));
        assert_ne!(ObjectId::digest(b"same"), ObjectId::digest(b"other"));
    }

    #[test]
    fn zero_is_null() {
        assert!(ObjectId::ZERO.is_null());
        assert!(!ObjectId::digest(b"").is_null());
    }

    #[test]
    fn parses_its_display_form() {
        let id = ObjectId::digest(b"parse me");
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(matches!("abcd".parse::<ObjectId>(), Err(TypeError::InvalidHex(_))));
        assert!(matches!("zz".repeat(32).parse::<ObjectId>(), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ObjectId::digest(b"json");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<ObjectId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<ObjectId>("\"nope\"").is_err());
    }

    #[test]
    fn debug_is_short() {
        let id = ObjectId::digest(b"x");
        assert_eq!(format!("{id:?}"), format!("ObjectId({:?})", id.short_hex()));
    }
}
