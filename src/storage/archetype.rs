//! Archetype storage: the chunked home of every entity sharing a type set.
//!
//! An archetype owns its record layout, a head-first list of regions (the
//! most recently allocated region is visited first), a LIFO pool of freed
//! slot addresses and the set of systems it matches. Slot reservation is
//! transactional: a [`Reservation`] describes where the requested slots
//! live without consuming the free pool until commit, and an abort hands
//! every carved slot back so nothing is leaked or lost.

use std::collections::VecDeque;
use std::ptr::{self, NonNull};

use log::warn;

use crate::component::{Registry, TypeMask};
use crate::error::Error;
use crate::layout::RecordLayout;
use crate::storage::region::{CHUNK_BYTES, Region};
use crate::system::SystemId;

/// The index of an archetype in the world's archetype slab.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Construct a new id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this id into the archetype slab.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A run of consecutive slots handed out by a reservation.
#[derive(Debug, Clone, Copy)]
struct Segment {
    /// Address of the first slot in the run.
    base: NonNull<u8>,

    /// Number of slots in the run.
    len: usize,
}

/// The outcome of a slot reservation, pending commit or abort.
///
/// Region counts are already advanced when the reservation is handed out;
/// the free-slot pool is only shrunk on commit. Abort hands every carved
/// slot to the free pool instead, and freshly allocated regions stay in
/// the region list, so no capacity is lost to a failed spawn.
#[derive(Debug)]
pub struct Reservation {
    /// Slot runs in assignment order: pooled slots first (newest first),
    /// then runs carved from regions.
    segments: Vec<Segment>,

    /// The free pool length to apply on commit.
    new_pool_len: usize,

    /// How many leading segments came from the free pool.
    pooled_segments: usize,
}

impl Reservation {
    /// The total number of reserved slots.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|segment| segment.len).sum()
    }

    /// Whether the reservation covers no slots.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate the reserved slot addresses in assignment order.
    pub fn slots(&self, family_size: usize) -> impl Iterator<Item = NonNull<u8>> + '_ {
        self.segments.iter().flat_map(move |segment| {
            (0..segment.len).map(move |index| unsafe {
                NonNull::new_unchecked(segment.base.as_ptr().add(index * family_size))
            })
        })
    }
}

/// The storage for all entities sharing one component type set.
pub struct Archetype {
    /// The type set this archetype stores.
    mask: TypeMask,

    /// The packed record layout shared by every slot.
    layout: RecordLayout,

    /// Regions, head first. New regions are prepended.
    regions: VecDeque<Region>,

    /// Freed slot addresses, reused LIFO before any region grows.
    free_slots: Vec<NonNull<u8>>,

    /// Systems whose filters match this archetype.
    matched: Vec<SystemId>,
}

impl Archetype {
    /// Create the storage for a type set, planning its record layout.
    ///
    /// No region is allocated until the first reservation needs one.
    pub fn new(registry: &Registry, mask: TypeMask) -> Self {
        let layout = RecordLayout::plan(registry, &mask);
        Self {
            mask,
            layout,
            regions: VecDeque::new(),
            free_slots: Vec::new(),
            matched: Vec::new(),
        }
    }

    /// The type set this archetype stores.
    #[inline]
    pub fn mask(&self) -> &TypeMask {
        &self.mask
    }

    /// The record layout shared by every slot.
    #[inline]
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Iterate the regions head first.
    #[inline]
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Systems whose filters match this archetype.
    #[inline]
    pub fn matched(&self) -> &[SystemId] {
        &self.matched
    }

    #[inline]
    pub(crate) fn matched_mut(&mut self) -> &mut Vec<SystemId> {
        &mut self.matched
    }

    /// How many slots fit one region.
    ///
    /// Meaningless for zero-sized families, which never back a region.
    #[inline]
    pub fn slots_per_region(&self) -> usize {
        debug_assert!(self.layout.family_size() > 0);
        CHUNK_BYTES / self.layout.family_size()
    }

    /// The number of live slots: every slot handed out and not sitting in
    /// the free pool.
    pub fn live_slots(&self) -> usize {
        let handed_out: usize = self.regions.iter().map(Region::count).sum();
        handed_out - self.free_slots.len()
    }

    /// Reserve `count` slots.
    ///
    /// Freed slots are reused first, newest first; the remainder extends
    /// the head region, prepending fresh regions as they fill. The free
    /// pool itself is untouched until [`commit`](Self::commit). On an
    /// allocation failure every carved count is rolled back before the
    /// error returns.
    pub fn reserve(&mut self, count: usize) -> Result<Reservation, Error> {
        let mut reservation = Reservation {
            segments: Vec::new(),
            new_pool_len: self.free_slots.len(),
            pooled_segments: 0,
        };
        if count == 0 {
            return Ok(reservation);
        }

        let family_size = self.layout.family_size();
        if family_size == 0 {
            // A single unbacked region; its count grows without allocation.
            if self.regions.is_empty() {
                self.regions.push_front(Region::unbacked());
            }
            let head = self.regions.front_mut().expect("virtual head region");
            head.grow(count);
            reservation.segments.push(Segment {
                base: head.base(),
                len: count,
            });
            return Ok(reservation);
        }

        // Recycled slots first. The pool is read, not popped; commit
        // applies the shrink.
        let pooled = count.min(self.free_slots.len());
        for index in 0..pooled {
            let slot = self.free_slots[self.free_slots.len() - 1 - index];
            reservation.segments.push(Segment { base: slot, len: 1 });
        }
        reservation.new_pool_len = self.free_slots.len() - pooled;
        reservation.pooled_segments = pooled;

        let per_region = self.slots_per_region();
        if per_region == 0 {
            // The family cannot fit a single slot in a chunk.
            warn!(
                "family of {} bytes does not fit a {CHUNK_BYTES} byte region",
                family_size
            );
            self.rollback(&reservation);
            return Err(Error::Alloc);
        }
        let mut remaining = count - pooled;
        while remaining > 0 {
            let head_free = self
                .regions
                .front()
                .map_or(0, |region| per_region - region.count());
            if head_free == 0 {
                match Region::alloc(self.layout.align()) {
                    Ok(region) => self.regions.push_front(region),
                    Err(err) => {
                        self.rollback(&reservation);
                        return Err(err);
                    }
                }
                continue;
            }

            let head = self.regions.front_mut().expect("head region");
            let take = head_free.min(remaining);
            let base = head.slot(head.count(), family_size);
            head.grow(take);
            reservation.segments.push(Segment { base, len: take });
            remaining -= take;
        }

        Ok(reservation)
    }

    /// Make a reservation permanent by applying the free-pool shrink.
    pub fn commit(&mut self, reservation: Reservation) {
        self.free_slots.truncate(reservation.new_pool_len);
    }

    /// Throw a reservation away.
    pub fn abort(&mut self, reservation: Reservation) {
        self.rollback(&reservation);
    }

    /// Hand every carved slot of a dead reservation to the free pool.
    /// Region counts and fresh regions stay, so the capacity is reused by
    /// later reservations instead of being lost.
    fn rollback(&mut self, reservation: &Reservation) {
        let family_size = self.layout.family_size();
        if family_size == 0 {
            if let Some(head) = self.regions.front_mut() {
                head.shrink(reservation.len());
            }
            return;
        }

        for segment in &reservation.segments[reservation.pooled_segments..] {
            for index in 0..segment.len {
                let slot = unsafe {
                    NonNull::new_unchecked(segment.base.as_ptr().add(index * family_size))
                };
                unsafe {
                    ptr::write_bytes(slot.as_ptr(), 0, family_size);
                }
                self.free_slots.push(slot);
            }
        }
    }

    /// Return a slot to the archetype after its entity is deleted.
    ///
    /// The record bytes are zeroed now so the slot's next occupant (and any
    /// dispatch that walks it before reuse) observes the zero-fill
    /// guarantee. Slots are never compacted.
    pub fn release(&mut self, record: NonNull<u8>) {
        let family_size = self.layout.family_size();
        if family_size == 0 {
            if let Some(head) = self.regions.front_mut() {
                head.shrink(1);
            }
            return;
        }
        unsafe {
            ptr::write_bytes(record.as_ptr(), 0, family_size);
        }
        self.free_slots.push(record);
    }
}
