//! The component type registry.
//!
//! Assigns integer ids to runtime type descriptors. Names are interned in a
//! sharded map at registration so the name lookup on the component-access
//! path is lock-free; the descriptor list itself sits behind a lock that is
//! only written during the grow-only registration phase.

use std::sync::RwLock;

use dashmap::DashMap;
use log::{debug, warn};

use crate::component::{TypeId, TypeInfo};
use crate::error::Error;

/// A registry of runtime component type descriptors.
///
/// A type's id equals the count of types registered before it. Ids are
/// stable for the lifetime of the world and no two registered types share a
/// name.
pub struct Registry {
    /// Map from interned name to type id. Lock-free reads.
    name_map: DashMap<Box<str>, TypeId>,

    /// Registered descriptors, indexed by type id.
    types: RwLock<Vec<TypeInfo>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new, empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            name_map: DashMap::new(),
            types: RwLock::new(Vec::new()),
        }
    }

    /// Register a type descriptor and get its assigned id.
    ///
    /// Fails with [`Error::DuplicateName`] if the name is already taken.
    /// `align` must be a power of two (checked in debug builds); `size` may
    /// be zero for tag types.
    pub fn register(&self, name: &str, size: usize, align: usize) -> Result<TypeId, Error> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        if self.name_map.contains_key(name) {
            warn!("type with identifier already registered ({name})");
            return Err(Error::DuplicateName(name.to_string()));
        }

        let mut types = self.types.write().unwrap();
        let id = TypeId::new(types.len() as u32);
        types.push(TypeInfo::new(id, name, size, align));
        self.name_map.insert(Box::from(name), id);

        debug!("type registered ({name}), size {size}, alignment {align}");
        Ok(id)
    }

    /// Look up a type id by name.
    #[inline]
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.name_map.get(name).map(|entry| *entry.value())
    }

    /// Get a copy of the descriptor for an id.
    #[inline]
    pub fn info(&self, id: TypeId) -> Option<TypeInfo> {
        self.types.read().unwrap().get(id.index()).cloned()
    }

    /// The number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.read().unwrap().len()
    }

    /// Check whether no types have been registered yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
