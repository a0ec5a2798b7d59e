//! Component type descriptors, identifiers and type-set masks.
//!
//! Component types are not Rust types. They are registered at runtime as a
//! `(name, size, alignment)` descriptor and addressed afterwards by name or
//! by the small integer [`TypeId`] the registry hands out. Everything the
//! storage layer needs to pack and copy a component is in the descriptor.

mod mask;
mod registry;

pub use mask::TypeMask;
pub use registry::Registry;

use std::sync::Arc;

/// A unique identifier for a registered component type.
///
/// The id is the type's ordinal in the registry and is stable for the
/// lifetime of the world. It doubles as the bit position of the type in a
/// [`TypeMask`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Construct a new id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this id for use in indexable storage (Vec, bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for TypeId {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// The descriptor of a registered component type.
///
/// Immutable after registration. The recorded `size` is the type's logical
/// size in bytes; the layout planner may record a larger per-slot size to
/// absorb padding, but that never changes the descriptor.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// The unique type id.
    id: TypeId,

    /// The registered name, unique within the world.
    name: Arc<str>,

    /// Logical size in bytes. May be zero (tag types).
    size: usize,

    /// Required alignment, a power of two.
    align: usize,
}

impl TypeInfo {
    /// Construct a descriptor. Only the registry creates these.
    pub(crate) fn new(id: TypeId, name: &str, size: usize, align: usize) -> Self {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
        Self {
            id,
            name: Arc::from(name),
            size,
            align,
        }
    }

    /// Get the type id.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Get the registered name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the logical size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the required alignment.
    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }
}
