//! Error kinds surfaced by world operations.
//!
//! Every error is a local return: no operation retries internally, any
//! partial state is rolled back before the error surfaces, and no error
//! crosses a system callback boundary.

use std::fmt;

use crate::entity::Entity;

/// The failure kinds of the public world operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A backing region or container allocation returned null.
    Alloc,

    /// A type or system was registered under a name that is already taken.
    DuplicateName(String),

    /// A requirement string or component access named a type that is not in
    /// the registry.
    UnknownType(String),

    /// A requirement string lists more tokens than there are registered
    /// types, so it cannot be satisfied.
    TypeCountExceeded {
        /// Number of tokens in the requirement string.
        requested: usize,
        /// Number of registered types at the time of the call.
        registered: usize,
    },

    /// The entity id has no archetype (never spawned, or despawned).
    NoSuchEntity(Entity),

    /// The entity's archetype does not contain the named type.
    NoSuchComponent(String),

    /// `run` named a system that is not registered.
    NoSuchSystem(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Alloc => write!(f, "allocation failure"),
            Error::DuplicateName(name) => {
                write!(f, "name already registered ({name})")
            }
            Error::UnknownType(name) => {
                write!(f, "no type registered with the identifier ({name})")
            }
            Error::TypeCountExceeded {
                requested,
                registered,
            } => write!(
                f,
                "requirement lists {requested} types but only {registered} are registered"
            ),
            Error::NoSuchEntity(entity) => {
                write!(f, "entity ({}) has no components", entity.id())
            }
            Error::NoSuchComponent(name) => {
                write!(f, "entity does not have the component type ({name})")
            }
            Error::NoSuchSystem(name) => {
                write!(f, "no system registered with the identifier ({name})")
            }
        }
    }
}

impl std::error::Error for Error {}
