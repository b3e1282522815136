//! Version vectors and versioned objects.
//!
//! A [`VersionVector`] maps each [`UserId`] to the number of changes that
//! user has contributed. Comparing two vectors entry by entry tells whether
//! one version causally precedes the other or whether they diverged.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::object::ObjectId;

/// Causal relation between two versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CausalOrder {
    /// The left version happened strictly before the right one.
    Before,
    /// The left version happened strictly after the right one.
    After,
    /// Both versions carry identical vectors.
    Equal,
    /// Neither version dominates the other.
    Concurrent,
}

impl CausalOrder {
    /// `true` for [`CausalOrder::After`] and [`CausalOrder::Equal`].
    pub fn is_at_least(&self) -> bool {
        matches!(self, Self::After | Self::Equal)
    }
}

/// Per-user change counters. Missing entries count as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionVector(BTreeMap<UserId, u64>);

impl VersionVector {
    /// The all-zero vector.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Counter for `user` (zero when absent).
    pub fn get(&self, user: &UserId) -> u64 {
        self.0.get(user).copied().unwrap_or(0)
    }

    /// Set the counter for `user`. Setting zero removes the entry so that
    /// equal vectors always compare equal structurally.
    pub fn set(&mut self, user: UserId, value: u64) {
        if value == 0 {
            self.0.remove(&user);
        } else {
            self.0.insert(user, value);
        }
    }

    /// Increment the counter for `user` by one.
    pub fn increment(&mut self, user: UserId) {
        *self.0.entry(user).or_insert(0) += 1;
    }

    /// Pointwise maximum of `self` and `other`.
    pub fn merge(&mut self, other: &VersionVector) {
        for (user, &count) in &other.0 {
            let entry = self.0.entry(*user).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    /// Compare two vectors causally.
    pub fn compare(&self, other: &VersionVector) -> CausalOrder {
        let mut ordering = Ordering::Equal;

        let users = self.0.keys().chain(other.0.keys());
        for user in users {
            match (self.get(user).cmp(&other.get(user)), ordering) {
                (Ordering::Equal, _) => {}
                (step, Ordering::Equal) => ordering = step,
                (step, current) if step == current => {}
                _ => return CausalOrder::Concurrent,
            }
        }

        match ordering {
            Ordering::Less => CausalOrder::Before,
            Ordering::Greater => CausalOrder::After,
            Ordering::Equal => CausalOrder::Equal,
        }
    }

    /// Iterate over the non-zero entries in user order.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &u64)> {
        self.0.iter()
    }

    /// Returns `true` when every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(UserId, u64)> for VersionVector {
    fn from_iter<I: IntoIterator<Item = (UserId, u64)>>(iter: I) -> Self {
        let mut vv = Self::new();
        for (user, count) in iter {
            vv.set(user, count);
        }
        vv
    }
}

/// An object id together with the version vector of the state it captures.
///
/// A branch root is a `VersionedObject`: `object_id` names the root tree and
/// `versions` records how many changes each user contributed to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedObject {
    pub object_id: ObjectId,
    pub versions: VersionVector,
}

impl VersionedObject {
    pub fn new(object_id: ObjectId, versions: VersionVector) -> Self {
        Self {
            object_id,
            versions,
        }
    }

    /// Return a copy pointing at `new_root` with the `owner` entry advanced
    /// by one. Every other entry is carried over unchanged.
    pub fn advance(&self, owner: UserId, new_root: ObjectId) -> Self {
        let mut versions = self.versions.clone();
        versions.increment(owner);
        Self {
            object_id: new_root,
            versions,
        }
    }

    /// Compare the version vectors. Object ids play no part in the result.
    pub fn compare(&self, other: &VersionedObject) -> CausalOrder {
        self.versions.compare(&other.versions)
    }

    /// Copy with the object id replaced and the vector kept.
    pub fn with_object(&self, object_id: ObjectId) -> Self {
        Self {
            object_id,
            versions: self.versions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user(n: u8) -> UserId {
        UserId::from_bytes([n; 16])
    }

    fn vv(entries: &[(u8, u64)]) -> VersionVector {
        entries.iter().map(|&(u, c)| (user(u), c)).collect()
    }

    #[test]
    fn empty_vectors_are_equal() {
        assert_eq!(VersionVector::new().compare(&VersionVector::new()), CausalOrder::Equal);
    }

    #[test]
    fn strictly_smaller_is_before() {
        let a = vv(&[(1, 1), (2, 3)]);
        let b = vv(&[(1, 2), (2, 3)]);
        assert_eq!(a.compare(&b), CausalOrder::Before);
        assert_eq!(b.compare(&a), CausalOrder::After);
    }

    #[test]
    fn missing_entry_counts_as_zero() {
        let a = vv(&[(1, 1)]);
        let b = vv(&[(1, 1), (2, 1)]);
        assert_eq!(a.compare(&b), CausalOrder::Before);
    }

    #[test]
    fn diverged_vectors_are_concurrent() {
        let a = vv(&[(1, 2), (2, 1)]);
        let b = vv(&[(1, 1), (2, 2)]);
        assert_eq!(a.compare(&b), CausalOrder::Concurrent);
        assert_eq!(b.compare(&a), CausalOrder::Concurrent);
    }

    #[test]
    fn zero_entries_are_not_stored() {
        let mut a = vv(&[(1, 0)]);
        assert!(a.is_empty());
        a.set(user(2), 0);
        assert_eq!(a, VersionVector::new());
    }

    #[test]
    fn merge_takes_pointwise_max() {
        let mut a = vv(&[(1, 3), (2, 1)]);
        a.merge(&vv(&[(2, 4), (3, 1)]));
        assert_eq!(a, vv(&[(1, 3), (2, 4), (3, 1)]));
    }

    #[test]
    fn advance_bumps_only_owner() {
        let root = VersionedObject::new(ObjectId::digest(b"old"), vv(&[(1, 2), (2, 5)]));
        let next = root.advance(user(1), ObjectId::digest(b"new"));

        assert_eq!(next.object_id, ObjectId::digest(b"new"));
        assert_eq!(next.versions.get(&user(1)), 3);
        assert_eq!(next.versions.get(&user(2)), 5);
        assert_eq!(root.compare(&next), CausalOrder::Before);
    }

    #[test]
    fn serde_roundtrip() {
        let obj = VersionedObject::new(ObjectId::digest(b"root"), vv(&[(7, 9)]));
        let json = serde_json::to_string(&obj).unwrap();
        let parsed: VersionedObject = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, obj);
    }

    fn arb_vv() -> impl Strategy<Value = VersionVector> {
        proptest::collection::btree_map(0u8..4, 0u64..5, 0..4)
            .prop_map(|m| m.into_iter().map(|(u, c)| (user(u), c)).collect())
    }

    proptest! {
        #[test]
        fn compare_is_antisymmetric(a in arb_vv(), b in arb_vv()) {
            let expected = match a.compare(&b) {
                CausalOrder::Before => CausalOrder::After,
                CausalOrder::After => CausalOrder::Before,
                other => other,
            };
            prop_assert_eq!(b.compare(&a), expected);
        }

        #[test]
        fn merge_dominates_both_inputs(a in arb_vv(), b in arb_vv()) {
            let mut merged = a.clone();
            merged.merge(&b);
            prop_assert!(merged.compare(&a).is_at_least());
            prop_assert!(merged.compare(&b).is_at_least());
        }

        #[test]
        fn increment_is_strictly_after(a in arb_vv(), u in 0u8..4) {
            let mut next = a.clone();
            next.increment(user(u));
            prop_assert_eq!(next.compare(&a), CausalOrder::After);
        }
    }
}
