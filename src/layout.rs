//! Packed record layouts for archetype storage.
//!
//! An archetype stores one record (a "family") per entity: every component
//! the entity carries, packed back to back. The planner runs once per
//! archetype and bakes an offset table so the dispatch hot path can compute
//! a component pointer as `base + slot * family_size + offset` with no
//! lookups.
//!
//! Packing is greedy: the widest member leads at offset zero, then each
//! trailing hole up to the family alignment boundary is filled by the
//! largest remaining member that fits. Holes no remaining member fits are
//! absorbed into the previously emitted entry's recorded size so later
//! offsets stay aligned. There is no trailing pad after the final entry;
//! the family size is simply the sum of recorded sizes and may be zero for
//! tag-only archetypes.

use log::trace;

use crate::component::{Registry, TypeId, TypeMask};

/// One placed member of a record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// The component type occupying this span.
    pub id: TypeId,

    /// Recorded size in bytes. At least the type's logical size; absorbed
    /// padding makes it larger. The pad bytes are not part of the
    /// component's logical storage.
    pub size: usize,

    /// Byte offset of the component within the record.
    pub offset: usize,
}

/// The packed per-entity record layout of one archetype.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    /// Members in placement order.
    entries: Vec<Entry>,

    /// Total bytes of one record.
    family_size: usize,

    /// Record alignment, the maximum member alignment.
    align: usize,
}

impl RecordLayout {
    /// Plan the layout for the types in `mask`.
    ///
    /// An empty mask yields an empty layout with family size zero.
    ///
    /// # Panics
    /// Panics if the mask references a type id the registry does not know.
    pub fn plan(registry: &Registry, mask: &TypeMask) -> Self {
        let mut members: Vec<_> = mask
            .ones()
            .map(|id| {
                registry
                    .info(id)
                    .expect("mask references an unregistered type")
            })
            .collect();

        if members.is_empty() {
            return Self {
                entries: Vec::new(),
                family_size: 0,
                align: 1,
            };
        }

        let align = members.iter().map(|m| m.align()).max().unwrap_or(1);

        // The widest member leads. Ties keep the lowest type id, which is
        // the scan order of the mask.
        let mut widest = 0;
        for (index, member) in members.iter().enumerate().skip(1) {
            if member.size() > members[widest].size() {
                widest = index;
            }
        }

        // (id, recorded size) in placement order.
        let first = members.remove(widest);
        let mut remaining_bytes = align - first.size() % align;
        let mut ordered = vec![(first.id(), first.size())];

        while !members.is_empty() {
            // Largest remaining member that fits the trailing hole, with an
            // early exit on a perfect fit.
            let mut fitter: Option<usize> = None;
            for (index, member) in members.iter().enumerate() {
                if member.size() <= remaining_bytes
                    && fitter.is_none_or(|best| member.size() > members[best].size())
                {
                    let exact = member.size() == remaining_bytes;
                    fitter = Some(index);
                    if exact {
                        break;
                    }
                }
            }

            let next = match fitter {
                Some(index) => members.remove(index),
                None => {
                    // Nothing fits the hole. Absorb it into the previous
                    // entry so later offsets stay aligned, then continue in
                    // scan order.
                    let last = ordered.last_mut().expect("at least one placed member");
                    last.1 += remaining_bytes;
                    members.remove(0)
                }
            };

            remaining_bytes = align - next.size() % align;
            ordered.push((next.id(), next.size()));
        }

        // Offsets are the running total of recorded sizes.
        let mut entries = Vec::with_capacity(ordered.len());
        let mut family_size = 0;
        for (id, size) in ordered {
            trace!("layout entry: type {id:?}, size {size}, offset {family_size}");
            entries.push(Entry {
                id,
                size,
                offset: family_size,
            });
            family_size += size;
        }
        trace!("family size {family_size}, alignment {align}");

        Self {
            entries,
            family_size,
            align,
        }
    }

    /// Members in placement order.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Total bytes of one record. Zero for tag-only archetypes.
    #[inline]
    pub fn family_size(&self) -> usize {
        self.family_size
    }

    /// Record alignment.
    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    /// Byte offset of a member type within the record.
    #[inline]
    pub fn offset_of(&self, id: TypeId) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(types: &[(&str, usize, usize)]) -> Registry {
        let registry = Registry::new();
        for &(name, size, align) in types {
            registry.register(name, size, align).unwrap();
        }
        registry
    }

    fn full_mask(registry: &Registry) -> TypeMask {
        let mut mask = TypeMask::with_width(registry.len());
        for index in 0..registry.len() {
            mask.insert(TypeId::from(index));
        }
        mask
    }

    /// Every member appears once, offsets are aligned, the widest member
    /// leads, and the family size stays within the rounded-up bound.
    fn verify_invariants(registry: &Registry, mask: &TypeMask, layout: &RecordLayout) {
        let members: Vec<_> = mask.ones().map(|id| registry.info(id).unwrap()).collect();
        assert_eq!(layout.entries().len(), members.len());

        let mut logical_total = 0;
        let mut rounded_total = 0;
        for member in &members {
            let entry = layout
                .entries()
                .iter()
                .find(|e| e.id == member.id())
                .expect("every mask member is placed");
            assert_eq!(entry.offset % member.align(), 0, "misaligned offset");
            assert!(entry.offset + member.size() <= layout.family_size());
            logical_total += member.size();
            rounded_total += member.size().next_multiple_of(layout.align());
        }
        assert!(logical_total <= layout.family_size() || layout.family_size() == 0);
        assert!(layout.family_size() <= rounded_total.max(layout.align()));

        if let Some(first) = layout.entries().first() {
            let max_size = members.iter().map(|m| m.size()).max().unwrap();
            assert_eq!(registry.info(first.id).unwrap().size(), max_size);
        }
    }

    #[test]
    fn packs_primitive_quartet() {
        // Given - int, float, char, short
        let registry = registry_of(&[("int", 4, 4), ("float", 4, 4), ("char", 1, 1), ("short", 2, 2)]);
        let mask = full_mask(&registry);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then - int leads, float fills the lane, short before char
        assert_eq!(layout.align(), 4);
        assert_eq!(layout.offset_of(TypeId::new(0)), Some(0));
        assert_eq!(layout.offset_of(TypeId::new(1)), Some(4));
        assert_eq!(layout.offset_of(TypeId::new(3)), Some(8));
        assert_eq!(layout.offset_of(TypeId::new(2)), Some(10));
        assert_eq!(layout.family_size(), 11);
        verify_invariants(&registry, &mask, &layout);
    }

    #[test]
    fn small_types_pack_behind_the_widest() {
        // Given - a 16 byte leader, two single bytes and an 8 byte member
        let registry = registry_of(&[("a", 16, 16), ("b", 1, 1), ("c", 1, 1), ("d", 8, 8)]);
        let mask = full_mask(&registry);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then
        assert!(layout.family_size() <= 32);
        assert_eq!(layout.offset_of(TypeId::new(0)), Some(0));
        assert_eq!(layout.offset_of(TypeId::new(3)).unwrap() % 8, 0);
        verify_invariants(&registry, &mask, &layout);
    }

    #[test]
    fn absorbs_holes_nothing_fits() {
        // Given - a 6 byte leader leaves a 2 byte hole no member fits
        let registry = registry_of(&[("a", 6, 4), ("b", 3, 1), ("c", 3, 1)]);
        let mask = full_mask(&registry);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then - the holes were absorbed into the preceding recorded sizes
        let first = layout.entries()[0];
        assert_eq!(first.id, TypeId::new(0));
        assert_eq!(first.size, 8);
        assert_eq!(layout.offset_of(TypeId::new(1)), Some(8));
        assert_eq!(layout.offset_of(TypeId::new(2)), Some(12));
        assert_eq!(layout.family_size(), 15);
        verify_invariants(&registry, &mask, &layout);
    }

    #[test]
    fn single_type_mask() {
        // Given
        let registry = registry_of(&[("int", 4, 4)]);
        let mask = full_mask(&registry);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then
        assert_eq!(layout.family_size(), 4);
        assert_eq!(layout.align(), 4);
        assert_eq!(layout.offset_of(TypeId::new(0)), Some(0));
    }

    #[test]
    fn empty_mask() {
        // Given
        let registry = Registry::new();
        let mask = TypeMask::with_width(0);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then
        assert_eq!(layout.family_size(), 0);
        assert_eq!(layout.align(), 1);
        assert!(layout.entries().is_empty());
    }

    #[test]
    fn tag_only_family_is_zero_sized() {
        // Given
        let registry = registry_of(&[("tag", 0, 1)]);
        let mask = full_mask(&registry);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then
        assert_eq!(layout.family_size(), 0);
        assert_eq!(layout.offset_of(TypeId::new(0)), Some(0));
    }

    #[test]
    fn widest_tie_keeps_lowest_id() {
        // Given - two members of equal size
        let registry = registry_of(&[("first", 4, 4), ("second", 4, 4)]);
        let mask = full_mask(&registry);

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then
        assert_eq!(layout.entries()[0].id, TypeId::new(0));
        assert_eq!(layout.family_size(), 8);
    }

    #[test]
    fn offset_of_unknown_member() {
        // Given
        let registry = registry_of(&[("int", 4, 4), ("float", 4, 4)]);
        let mut mask = TypeMask::with_width(2);
        mask.insert(TypeId::new(0));

        // When
        let layout = RecordLayout::plan(&registry, &mask);

        // Then
        assert_eq!(layout.offset_of(TypeId::new(1)), None);
    }
}
