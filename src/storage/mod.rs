//! Chunked record storage.
//!
//! Entities sharing a component type set live together in an
//! [`Archetype`](archetype::Archetype): a packed record per entity, records
//! laid out back to back inside fixed-size [`Region`](region::Region)
//! chunks. The region list is head first, deleted slots go to a per
//! archetype free pool, and slot reservation is a commit/abort
//! transaction.

pub mod archetype;
pub mod region;

pub use archetype::{Archetype, ArchetypeId, Reservation};
pub use region::{CHUNK_BYTES, Region};
