//! A chunked, string-keyed archetype ECS world.
//!
//! Component types are registered at runtime as `(name, size, alignment)`
//! descriptors rather than Rust types. Entities holding the same set of
//! types are co-located in an archetype: densely packed per-entity
//! records laid out by a greedy packer inside fixed 16 KiB regions.
//! Systems declare what they run over with a requirement string
//! (`"position, velocity, !frozen"`) and receive a raw-pointer context
//! per live slot, so component access at the callback boundary is untyped
//! by contract.
//!
//! # Layering
//!
//! ```text
//! world        spawn / migrate / despawn / component / run / step
//!   ├─ component    type registry, descriptors, type-set masks
//!   ├─ layout       packed record layouts (offset tables)
//!   ├─ storage      archetypes, 16 KiB regions, slot reservation
//!   ├─ system       filters, callbacks, invocation contexts
//!   └─ entity       directory, recycled-id stack
//! ```
//!
//! # Example
//!
//! ```ignore
//! use comb::{Invocation, World};
//!
//! let mut world = World::new();
//! world.register_type("position", 8, 4)?;
//! world.register_type("velocity", 8, 4)?;
//!
//! world.register_system("integrate", "position, velocity", |ctx: &mut Invocation, dt: f64| {
//!     let position = ctx.operand(0).cast::<[f32; 2]>().as_ptr();
//!     let velocity = ctx.operand(1).cast::<[f32; 2]>().as_ptr();
//!     unsafe {
//!         (*position)[0] += (*velocity)[0] * dt as f32;
//!         (*position)[1] += (*velocity)[1] * dt as f32;
//!     }
//! })?;
//!
//! let entities = world.spawn(100, "position, velocity")?.to_vec();
//! world.step(1.0 / 60.0);
//! ```

pub mod component;
pub mod entity;
pub mod error;
pub mod layout;
pub mod storage;
pub mod system;
pub mod world;

pub use component::{Registry, TypeId, TypeInfo, TypeMask};
pub use entity::Entity;
pub use error::Error;
pub use storage::{ArchetypeId, CHUNK_BYTES};
pub use system::{Filter, Invocation, SystemFn, SystemId};
pub use world::World;
