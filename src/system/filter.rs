//! Requirement strings and the filters parsed from them.
//!
//! A requirement string is a comma-separated list of type names, each
//! optionally prefixed with `!` for exclusion:
//!
//! ```text
//! requirements := token (',' token)*
//! token        := ws* ('!' name | name) ws*
//! ```
//!
//! Whitespace is stripped before tokenisation and empty tokens are
//! skipped, so `" position , !frozen "` parses the same as
//! `"position,!frozen"`. Names are matched bytewise against registered
//! type names. The order of inclusion tokens is part of the public
//! contract: it is the operand order a system callback indexes with.

use log::warn;

use crate::component::{Registry, TypeId, TypeMask};
use crate::error::Error;

/// The parsed type-set filter of a system.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Types an archetype must contain.
    include: TypeMask,

    /// Types an archetype must not contain.
    exclude: TypeMask,

    /// Inclusion type ids in requirement-string order. Exclusions do not
    /// contribute.
    operands: Vec<TypeId>,
}

impl Filter {
    /// Parse a requirement string against the registry.
    ///
    /// Fails with [`Error::TypeCountExceeded`] when the string lists more
    /// tokens than there are registered types, or [`Error::UnknownType`]
    /// when a name is not registered.
    pub fn parse(registry: &Registry, input: &str) -> Result<Self, Error> {
        let width = registry.len();
        let mut filter = Self {
            include: TypeMask::with_width(width),
            exclude: TypeMask::with_width(width),
            operands: Vec::new(),
        };

        let stripped = strip_whitespace(input);
        let tokens = collect_tokens(&stripped, width)?;
        for token in tokens {
            let (name, excluded) = match token.strip_prefix('!') {
                Some(rest) => (rest, true),
                None => (token, false),
            };
            let id = lookup(registry, name)?;
            if excluded {
                filter.exclude.insert(id);
            } else {
                filter.include.insert(id);
                filter.operands.push(id);
            }
        }

        Ok(filter)
    }

    /// Whether an archetype with the given mask satisfies this filter.
    ///
    /// An archetype carrying types beyond the inclusions still matches;
    /// only an excluded type disqualifies it.
    #[inline]
    pub fn matches(&self, mask: &TypeMask) -> bool {
        self.include.is_subset_of(mask) && !self.exclude.intersects(mask)
    }

    /// Types an archetype must contain.
    #[inline]
    pub fn include(&self) -> &TypeMask {
        &self.include
    }

    /// Types an archetype must not contain.
    #[inline]
    pub fn exclude(&self) -> &TypeMask {
        &self.exclude
    }

    /// Inclusion type ids in requirement-string order.
    #[inline]
    pub fn operands(&self) -> &[TypeId] {
        &self.operands
    }
}

/// Parse a spawn-time type string into an inclusion mask.
///
/// Spawning accepts no polarity: every token is matched whole against the
/// registered names, so a `!` prefixed token fails as an unknown type.
pub(crate) fn include_mask(registry: &Registry, input: &str) -> Result<TypeMask, Error> {
    let width = registry.len();
    let mut mask = TypeMask::with_width(width);

    let stripped = strip_whitespace(input);
    for token in collect_tokens(&stripped, width)? {
        mask.insert(lookup(registry, token)?);
    }

    Ok(mask)
}

fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

fn collect_tokens<'a>(stripped: &'a str, registered: usize) -> Result<Vec<&'a str>, Error> {
    let tokens: Vec<&str> = stripped.split(',').filter(|t| !t.is_empty()).collect();
    if tokens.len() > registered {
        warn!(
            "requirement lists {} types but only {registered} are registered",
            tokens.len()
        );
        return Err(Error::TypeCountExceeded {
            requested: tokens.len(),
            registered,
        });
    }
    Ok(tokens)
}

fn lookup(registry: &Registry, name: &str) -> Result<TypeId, Error> {
    registry.find(name).ok_or_else(|| {
        warn!("requested type does not exist in the world ({name})");
        Error::UnknownType(name.to_string())
    })
}
