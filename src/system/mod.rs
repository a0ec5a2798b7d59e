//! Systems: a callback plus the type-set filter selecting what it runs on.
//!
//! A system owns its parsed [`Filter`], the set of archetypes it matched,
//! an offset scratch vector sized to its operand count, an optional
//! type-erased user-data slot and the boxed callback itself. Dispatch
//! walks every matched archetype, fills the scratch with that archetype's
//! operand offsets once, then visits every slot of every region handing
//! the callback a stack-resident [`Invocation`] context.
//!
//! Component access inside a callback is untyped by contract: the context
//! returns raw operand pointers and the caller casts them to the type it
//! registered. This is the crate's deliberate FFI-style boundary.

mod filter;

pub use filter::Filter;
pub(crate) use filter::include_mask;

use std::any::Any;
use std::ptr::NonNull;

use crate::storage::{Archetype, ArchetypeId};

/// The index of a system in the world's system slab.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(u32);

impl SystemId {
    /// Construct a new id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this id into the system slab.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The boxed callback a system runs per live slot.
pub type SystemFn = Box<dyn FnMut(&mut Invocation<'_>, f64)>;

/// The per-slot context handed to a system callback.
///
/// The context lives on the dispatch stack; nothing is allocated per
/// invocation. Operand pointers are computed from the slot base and the
/// per-archetype offset scratch.
pub struct Invocation<'a> {
    /// Base address of the current slot's record.
    base: NonNull<u8>,

    /// Offset of each operand within the record, in operand order.
    offsets: &'a [usize],

    /// The system's user data, if any.
    user_data: Option<&'a mut dyn Any>,
}

impl Invocation<'_> {
    /// Pointer to the i-th included operand for the current slot.
    ///
    /// The index follows the requirement-string order of the inclusion
    /// tokens. The caller casts the pointer to the registered type; for a
    /// zero-sized type the pointer must not be dereferenced.
    ///
    /// # Panics
    /// Panics if `index` is not below the system's operand count.
    #[inline]
    pub fn operand(&self, index: usize) -> NonNull<u8> {
        let offset = self.offsets[index];
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }

    /// The number of operands this system was registered with.
    #[inline]
    pub fn operand_count(&self) -> usize {
        self.offsets.len()
    }

    /// Downcast access to the user data the system was registered with.
    ///
    /// Returns `None` when the system has no user data or `T` is not its
    /// type.
    #[inline]
    pub fn user_data<T: 'static>(&mut self) -> Option<&mut T> {
        self.user_data.as_mut()?.downcast_mut::<T>()
    }
}

/// A registered system.
pub struct System {
    /// The unique system name.
    name: String,

    /// The parsed requirement filter.
    filter: Filter,

    /// The callback invoked once per live slot.
    callback: SystemFn,

    /// Type-erased user data surfaced through the invocation context.
    user_data: Option<Box<dyn Any>>,

    /// Operand offsets for the archetype currently being dispatched.
    /// Reused across invocations; one entry per operand.
    scratch: Vec<usize>,

    /// Archetypes whose masks satisfy the filter.
    matched: Vec<ArchetypeId>,
}

impl System {
    /// Build a system from its parsed parts.
    pub(crate) fn new(
        name: &str,
        filter: Filter,
        user_data: Option<Box<dyn Any>>,
        callback: SystemFn,
    ) -> Self {
        let scratch = vec![0; filter.operands().len()];
        Self {
            name: name.to_string(),
            filter,
            callback,
            user_data,
            scratch,
            matched: Vec::new(),
        }
    }

    /// The system's unique name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed requirement filter.
    #[inline]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Archetypes whose masks satisfy the filter.
    #[inline]
    pub fn matched(&self) -> &[ArchetypeId] {
        &self.matched
    }

    #[inline]
    pub(crate) fn matched_mut(&mut self) -> &mut Vec<ArchetypeId> {
        &mut self.matched
    }

    /// Run the callback over every slot of every matched archetype.
    ///
    /// The offset scratch is rebuilt once per archetype, not once per
    /// slot; the layout is archetype-stable. Regions are visited head
    /// first and slots in ascending index order.
    pub(crate) fn dispatch(&mut self, archetypes: &[Archetype], dt: f64) {
        let Self {
            filter,
            callback,
            user_data,
            scratch,
            matched,
            ..
        } = self;

        for &archetype_id in matched.iter() {
            let archetype = &archetypes[archetype_id.index()];
            let layout = archetype.layout();
            for (slot, &id) in scratch.iter_mut().zip(filter.operands()) {
                *slot = layout
                    .offset_of(id)
                    .expect("matched archetype is missing an operand type");
            }

            let family_size = layout.family_size();
            for region in archetype.regions() {
                let base = region.base();
                for index in 0..region.count() {
                    let record =
                        unsafe { NonNull::new_unchecked(base.as_ptr().add(index * family_size)) };
                    let mut ctx = Invocation {
                        base: record,
                        offsets: scratch.as_slice(),
                        user_data: user_data.as_deref_mut(),
                    };
                    callback(&mut ctx, dt);
                }
            }
        }
    }
}
