//! Fixed-width bitsets over component type ids.
//!
//! A [`TypeMask`] is both the identity of an archetype (the set of types
//! its entities carry) and the include/exclude halves of a system filter.
//! The width is fixed when the mask is built, to the number of registered
//! types at that moment, and is never widened retroactively. Types
//! registered later therefore never retroactively belong to an existing
//! archetype.

use std::hash::{Hash, Hasher};

use fixedbitset::FixedBitSet;

use crate::component::TypeId;

/// A set of component type ids backed by a [`FixedBitSet`].
///
/// Equality and hashing are set-semantic: two masks holding the same member
/// ids compare equal even if they were built at different widths. A mask
/// built after further type registrations still keys the archetype that was
/// created for the same member set earlier.
#[derive(Debug, Clone)]
pub struct TypeMask {
    /// The bitset. Bit N set means type id N is a member.
    bits: FixedBitSet,
}

impl TypeMask {
    /// Create an empty mask with room for `width` type ids.
    #[inline]
    pub fn with_width(width: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(width),
        }
    }

    /// The number of bit positions this mask was created with.
    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Add a type to the set.
    ///
    /// # Panics
    /// Panics if the id lies beyond the mask's width.
    #[inline]
    pub fn insert(&mut self, id: TypeId) {
        assert!(id.index() < self.bits.len(), "type id beyond mask width");
        self.bits.insert(id.index());
    }

    /// Check whether a type is a member of the set.
    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.bits.contains(id.index())
    }

    /// The number of member types.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    /// Check whether the set has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the member ids in ascending order.
    #[inline]
    pub fn ones(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.bits.ones().map(TypeId::from)
    }

    /// Check whether every member of `self` is also a member of `other`.
    /// Widths may differ; missing bit positions count as unset.
    #[inline]
    pub fn is_subset_of(&self, other: &TypeMask) -> bool {
        self.bits.is_subset(&other.bits)
    }

    /// Check whether the two sets share at least one member.
    #[inline]
    pub fn intersects(&self, other: &TypeMask) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }

    /// Iterate the ids present in both sets, in ascending order.
    #[inline]
    pub fn intersection<'a>(&'a self, other: &'a TypeMask) -> impl Iterator<Item = TypeId> + 'a {
        self.bits.intersection(&other.bits).map(TypeId::from)
    }
}

impl PartialEq for TypeMask {
    fn eq(&self, other: &Self) -> bool {
        self.bits.ones().eq(other.bits.ones())
    }
}

impl Eq for TypeMask {}

impl Hash for TypeMask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for index in self.bits.ones() {
            index.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::hash::{DefaultHasher, Hash, Hasher};

    use super::*;

    fn mask(width: usize, members: &[u32]) -> TypeMask {
        let mut mask = TypeMask::with_width(width);
        for &id in members {
            mask.insert(TypeId::new(id));
        }
        mask
    }

    fn hash_of(mask: &TypeMask) -> u64 {
        let mut hasher = DefaultHasher::new();
        mask.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn membership() {
        // Given
        let mask = mask(4, &[0, 2]);

        // Then
        assert!(mask.contains(TypeId::new(0)));
        assert!(!mask.contains(TypeId::new(1)));
        assert!(mask.contains(TypeId::new(2)));
        assert_eq!(mask.len(), 2);
        assert_eq!(
            mask.ones().collect::<Vec<_>>(),
            vec![TypeId::new(0), TypeId::new(2)]
        );
    }

    #[test]
    fn equality_ignores_width() {
        // Given - the same member set built at two widths
        let narrow = mask(3, &[0, 1]);
        let wide = mask(5, &[0, 1]);

        // Then
        assert_eq!(narrow, wide);
        assert_eq!(hash_of(&narrow), hash_of(&wide));

        // Then - a differing member set is unequal
        assert_ne!(narrow, mask(5, &[0, 1, 4]));
    }

    #[test]
    fn subset_and_intersection_across_widths() {
        // Given
        let small = mask(2, &[0, 1]);
        let large = mask(6, &[0, 1, 4]);

        // Then
        assert!(small.is_subset_of(&large));
        assert!(!large.is_subset_of(&small));
        assert!(small.intersects(&large));
        assert_eq!(
            large.intersection(&small).collect::<Vec<_>>(),
            vec![TypeId::new(0), TypeId::new(1)]
        );

        // Then - a member beyond the smaller width breaks the subset
        let outlier = mask(6, &[4]);
        assert!(!outlier.is_subset_of(&small));
        assert!(!outlier.intersects(&small));
    }

    #[test]
    fn empty_mask() {
        // Given
        let empty = TypeMask::with_width(0);
        let populated = mask(3, &[1]);

        // Then - the empty set is a subset of everything
        assert!(empty.is_empty());
        assert!(empty.is_subset_of(&populated));
        assert!(!empty.intersects(&populated));
        assert_eq!(empty, TypeMask::with_width(8));
    }
}
