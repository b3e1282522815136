use vine_types::ObjectId;

/// BLAKE3 hashing under a fixed domain tag.
///
/// The hasher is fed `<domain>:` before the payload, so equal bytes stored
/// as different kinds of object get different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const BLOB: Self = Self::new("vine-blob-v1");
    pub const TREE: Self = Self::new("vine-tree-v1");
    pub const INDIRECTION: Self = Self::new("vine-id-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let digest = blake3::Hasher::new()
            .update(self.domain.as_bytes())
            .update(b":")
            .update(data)
            .finalize();
        ObjectId::from_hash(digest.into())
    }

    /// `true` if `data` hashes to `expected` in this domain.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_id() {
        assert_eq!(ContentHasher::TREE.hash(b"{}"), ContentHasher::TREE.hash(b"{}"));
    }

    #[test]
    fn kinds_never_collide() {
        let payload = b"payload";
        let ids = [
            ContentHasher::BLOB.hash(payload),
            ContentHasher::TREE.hash(payload),
            ContentHasher::INDIRECTION.hash(payload),
            ObjectId::digest(payload),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn domain_is_prefixed_with_separator() {
        let expected = ObjectId::digest(b"vine-blob-v1:abc");
        assert_eq!(ContentHasher::BLOB.hash(b"abc"), expected);
        assert_eq!(ContentHasher::BLOB.domain(), "vine-blob-v1");
    }

    #[test]
    fn verify_rejects_other_content() {
        let id = ContentHasher::BLOB.hash(b"kept");
        assert!(ContentHasher::BLOB.verify(b"kept", &id));
        assert!(!ContentHasher::BLOB.verify(b"changed", &id));
        assert!(!ContentHasher::TREE.verify(b"kept", &id));
    }
}
