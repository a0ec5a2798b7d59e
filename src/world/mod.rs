//! The world: the top-level container of types, archetypes, systems and
//! entities.
//!
//! A world is created empty, grows types and systems during a
//! registration phase, then spawns entities and dispatches systems
//! freely. Archetypes are created lazily the first time a spawn names
//! their type set, and the archetype/system match graph is maintained
//! incrementally on both kinds of registration, so dispatch never scans
//! the full space.
//!
//! A world is a shared-nothing unit: it is `!Send` and must be driven by
//! one thread. Within a [`step`](World::step) systems run in registration
//! order; within a system, matched archetypes run in match insertion
//! order; within an archetype, regions head first and slots in ascending
//! order. Callbacks cannot re-enter the world: dispatch holds the world
//! exclusively and hands the callback only its invocation context.

use std::any::Any;
use std::collections::HashMap;
use std::ptr::{self, NonNull};

use log::{debug, warn};

use crate::component::{Registry, TypeId, TypeMask};
use crate::entity::{Directory, Entity};
use crate::error::Error;
use crate::storage::{Archetype, ArchetypeId, Reservation};
use crate::system::{self, Filter, Invocation, System, SystemFn, SystemId};

/// The top-level ECS container.
pub struct World {
    /// Archetype slab; an [`ArchetypeId`] is an index into it.
    archetypes: Vec<Archetype>,

    /// Archetype lookup by type-set mask.
    archetype_index: HashMap<TypeMask, ArchetypeId>,

    /// System slab in registration order; a [`SystemId`] is an index.
    systems: Vec<System>,

    /// System lookup by name.
    system_index: HashMap<String, SystemId>,

    /// The entity directory and id allocator.
    directory: Directory,

    /// Ids of the most recent spawn. Reused by every spawn; the previous
    /// contents are invalidated.
    last_spawned: Vec<Entity>,

    /// The component type registry. Dropped last.
    registry: Registry,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            archetypes: Vec::new(),
            archetype_index: HashMap::new(),
            systems: Vec::new(),
            system_index: HashMap::new(),
            directory: Directory::new(),
            last_spawned: Vec::new(),
            registry: Registry::new(),
        }
    }

    /// Register a component type descriptor.
    ///
    /// The assigned id equals the number of types registered before it.
    /// Fails with [`Error::DuplicateName`] if the name is taken.
    pub fn register_type(&mut self, name: &str, size: usize, align: usize) -> Result<TypeId, Error> {
        self.registry.register(name, size, align)
    }

    /// Register a system without user data.
    ///
    /// `requirements` follows the grammar in [`system::Filter`]: a comma
    /// separated list of type names, `!` prefixed for exclusion. The
    /// callback runs once per live slot of every matched archetype.
    pub fn register_system<F>(
        &mut self,
        name: &str,
        requirements: &str,
        callback: F,
    ) -> Result<SystemId, Error>
    where
        F: FnMut(&mut Invocation<'_>, f64) + 'static,
    {
        self.add_system(name, requirements, None, Box::new(callback))
    }

    /// Register a system carrying a type-erased user-data value, surfaced
    /// to the callback through [`Invocation::user_data`].
    pub fn register_system_with<F>(
        &mut self,
        name: &str,
        requirements: &str,
        user_data: Box<dyn Any>,
        callback: F,
    ) -> Result<SystemId, Error>
    where
        F: FnMut(&mut Invocation<'_>, f64) + 'static,
    {
        self.add_system(name, requirements, Some(user_data), Box::new(callback))
    }

    fn add_system(
        &mut self,
        name: &str,
        requirements: &str,
        user_data: Option<Box<dyn Any>>,
        callback: SystemFn,
    ) -> Result<SystemId, Error> {
        if self.system_index.contains_key(name) {
            warn!("system with identifier already registered ({name})");
            return Err(Error::DuplicateName(name.to_string()));
        }

        let filter = Filter::parse(&self.registry, requirements)?;
        let mut system = System::new(name, filter, user_data, callback);
        let id = SystemId::new(self.systems.len() as u32);

        // Link the new system against every existing archetype.
        for (index, archetype) in self.archetypes.iter_mut().enumerate() {
            if system.filter().matches(archetype.mask()) {
                archetype.matched_mut().push(id);
                system.matched_mut().push(ArchetypeId::new(index as u32));
            }
        }

        self.systems.push(system);
        self.system_index.insert(name.to_string(), id);
        debug!("system registered ({name})");
        Ok(id)
    }

    /// Spawn `count` entities carrying the comma-separated component
    /// types in `types`.
    ///
    /// Returns the spawned ids as a slice owned by the world; the next
    /// spawn reuses the buffer. Recycled ids are reissued before fresh
    /// ones. Freshly spawned records read as zero bytes across every
    /// component. On failure all partial state is rolled back.
    pub fn spawn(&mut self, count: usize, types: &str) -> Result<&[Entity], Error> {
        let mask = system::include_mask(&self.registry, types)?;
        let archetype_id = self.archetype_for(&mask);

        let mut ids = std::mem::take(&mut self.last_spawned);
        ids.clear();
        let batch = self.directory.assign_ids(count, &mut ids);

        let reservation = match self.archetypes[archetype_id.index()].reserve(count) {
            Ok(reservation) => reservation,
            Err(err) => {
                self.directory.rollback_ids(batch);
                self.last_spawned = ids;
                return Err(err);
            }
        };

        self.place(archetype_id, &reservation, &ids);
        self.archetypes[archetype_id.index()].commit(reservation);
        self.directory.commit_ids(batch);

        debug!(
            "spawned {count} entities [{types}], {} recycled, {} fresh",
            batch.recycled, batch.minted
        );
        self.last_spawned = ids;
        Ok(&self.last_spawned)
    }

    /// Re-home a live entity to the archetype of the given type set.
    ///
    /// Every component present in both the old and the new set is copied
    /// byte for byte; components only in the new set read as zero; the old
    /// slot returns to its archetype's free pool. Migrating an entity to
    /// its current archetype does nothing. Component pointers into the
    /// entity's old record are invalidated.
    pub fn migrate(&mut self, entity: Entity, types: &str) -> Result<(), Error> {
        let mask = system::include_mask(&self.registry, types)?;
        let Some((old_id, old_record)) = self.located(entity) else {
            warn!("entity ({}) contains no components", entity.id());
            return Err(Error::NoSuchEntity(entity));
        };

        let target = self.archetype_for(&mask);
        if target == old_id {
            return Ok(());
        }

        let reservation = self.archetypes[target.index()].reserve(1)?;
        let family_size = self.archetypes[target.index()].layout().family_size();
        let record = reservation
            .slots(family_size)
            .next()
            .expect("reservation for one slot");

        copy_shared_components(
            &self.registry,
            &self.archetypes[old_id.index()],
            old_record,
            &self.archetypes[target.index()],
            record,
        );

        self.archetypes[target.index()].commit(reservation);
        self.archetypes[old_id.index()].release(old_record);

        let address = self
            .directory
            .address_mut(entity)
            .expect("live entity has a directory entry");
        address.archetype = Some(target);
        address.record = record;

        debug!("migrated entity ({}) to [{types}]", entity.id());
        Ok(())
    }

    /// Delete an entity.
    ///
    /// The slot returns to its archetype's free pool and the id to the
    /// recycled stack, to be reissued by a later spawn.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), Error> {
        let Some((archetype_id, record)) = self.located(entity) else {
            warn!("entity ({}) contains no components", entity.id());
            return Err(Error::NoSuchEntity(entity));
        };

        self.archetypes[archetype_id.index()].release(record);

        let address = self
            .directory
            .address_mut(entity)
            .expect("live entity has a directory entry");
        address.archetype = None;
        address.record = NonNull::dangling();
        self.directory.recycle(entity);
        Ok(())
    }

    /// A pointer to the named component within an entity's record.
    ///
    /// The pointer is stable until the entity migrates. The caller casts
    /// it to the registered type; a zero-sized component yields a dangling
    /// pointer that must not be dereferenced. Writing through the pointer
    /// requires that no other access to the same record is in flight.
    pub fn component(&self, entity: Entity, name: &str) -> Result<NonNull<u8>, Error> {
        let Some((archetype_id, record)) = self.located(entity) else {
            warn!("entity ({}) contains no components", entity.id());
            return Err(Error::NoSuchEntity(entity));
        };

        let Some(id) = self.registry.find(name) else {
            warn!("no type registered with the identifier ({name})");
            return Err(Error::UnknownType(name.to_string()));
        };

        let archetype = &self.archetypes[archetype_id.index()];
        if !archetype.mask().contains(id) {
            warn!(
                "entity ({}) does not have the component type ({name})",
                entity.id()
            );
            return Err(Error::NoSuchComponent(name.to_string()));
        }

        let offset = archetype
            .layout()
            .offset_of(id)
            .expect("mask member is placed in the layout");
        Ok(unsafe { NonNull::new_unchecked(record.as_ptr().add(offset)) })
    }

    /// Run one system by name.
    pub fn run(&mut self, name: &str, dt: f64) -> Result<(), Error> {
        let Some(&system_id) = self.system_index.get(name) else {
            warn!("no system registered with the identifier ({name})");
            return Err(Error::NoSuchSystem(name.to_string()));
        };
        self.systems[system_id.index()].dispatch(&self.archetypes, dt);
        Ok(())
    }

    /// Run every system in registration order.
    pub fn step(&mut self, dt: f64) {
        let Self {
            systems, archetypes, ..
        } = self;
        for system in systems.iter_mut() {
            system.dispatch(archetypes, dt);
        }
    }

    /// Whether the entity currently lives in an archetype.
    #[inline]
    pub fn is_live(&self, entity: Entity) -> bool {
        self.directory.is_live(entity)
    }

    /// The number of registered component types.
    #[inline]
    pub fn type_count(&self) -> usize {
        self.registry.len()
    }

    /// The number of archetypes created so far.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// The number of entity ids ever minted, recycled ones included.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.directory.len()
    }

    /// The archetype and record of a live entity.
    fn located(&self, entity: Entity) -> Option<(ArchetypeId, NonNull<u8>)> {
        let address = self.directory.address(entity)?;
        address.archetype.map(|id| (id, address.record))
    }

    /// Find the archetype for a type set, creating and match-linking it on
    /// first use.
    fn archetype_for(&mut self, mask: &TypeMask) -> ArchetypeId {
        if let Some(&id) = self.archetype_index.get(mask) {
            return id;
        }

        let mut archetype = Archetype::new(&self.registry, mask.clone());
        let id = ArchetypeId::new(self.archetypes.len() as u32);

        // Link the new archetype against every existing system.
        for (index, system) in self.systems.iter_mut().enumerate() {
            if system.filter().matches(archetype.mask()) {
                system.matched_mut().push(id);
                archetype.matched_mut().push(SystemId::new(index as u32));
            }
        }

        self.archetype_index.insert(mask.clone(), id);
        self.archetypes.push(archetype);
        debug!("archetype created for {} types", mask.len());
        id
    }

    /// Point every assigned entity at its reserved slot, copying shared
    /// components over for entities that already lived in some archetype.
    fn place(&mut self, target: ArchetypeId, reservation: &Reservation, entities: &[Entity]) {
        let family_size = self.archetypes[target.index()].layout().family_size();
        for (record, &entity) in reservation.slots(family_size).zip(entities) {
            if let Some((old_id, old_record)) = self.located(entity) {
                if old_id != target {
                    copy_shared_components(
                        &self.registry,
                        &self.archetypes[old_id.index()],
                        old_record,
                        &self.archetypes[target.index()],
                        record,
                    );
                }
            }

            let address = self
                .directory
                .address_mut(entity)
                .expect("assigned entity has a directory entry");
            address.archetype = Some(target);
            address.record = record;
        }
    }
}

/// Copy every component present in both archetypes from one record to
/// another, using each side's own offset table. Only the logical size is
/// copied; absorbed padding stays behind.
fn copy_shared_components(
    registry: &Registry,
    from: &Archetype,
    from_record: NonNull<u8>,
    to: &Archetype,
    to_record: NonNull<u8>,
) {
    for id in from.mask().intersection(to.mask()) {
        let size = registry.info(id).map_or(0, |info| info.size());
        if size == 0 {
            continue;
        }
        let from_offset = from
            .layout()
            .offset_of(id)
            .expect("shared type is placed in the source layout");
        let to_offset = to
            .layout()
            .offset_of(id)
            .expect("shared type is placed in the target layout");
        unsafe {
            ptr::copy_nonoverlapping(
                from_record.as_ptr().add(from_offset),
                to_record.as_ptr().add(to_offset),
                size,
            );
        }
    }
}
