//! Query filters.
//!
//! A [`Query`] names component types an entity must have (`and`) and must
//! not have (`not`). Compiling it against a [`ComponentRegistry`] yields a
//! [`QueryMask`], which matches archetype keys directly.

use serde::{Deserialize, Serialize};

use crate::component::ComponentType;
use crate::error::{EcsError, Result};
use crate::mask::Mask;
use crate::registry::ComponentRegistry;

/// A compiled query: required and excluded component bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryMask {
    /// Bits a matching mask must have.
    pub required: Mask,
    /// Bits a matching mask must not have.
    pub excluded: Mask,
}

impl QueryMask {
    /// Pairs a required and an excluded mask.
    #[must_use]
    pub const fn new(required: Mask, excluded: Mask) -> Self {
        Self { required, excluded }
    }

    /// `(mask & required) == required && (mask & excluded) == 0`
    #[must_use]
    pub const fn matches(&self, mask: Mask) -> bool {
        mask.contains(self.required) && !mask.intersects(self.excluded)
    }
}

/// Which component types a query requires and which it excludes.
///
/// # Examples
///
/// ```rust
/// use ecs_core::{ComponentType, Query};
///
/// let position = ComponentType::tag("Position");
/// let frozen = ComponentType::tag("Frozen");
/// let moving = Query::new().with(&position).without(&frozen);
/// assert_eq!(moving.required().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    and: Vec<ComponentType>,
    not: Vec<ComponentType>,
}

impl Query {
    /// An empty query, matching every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `ty`.
    #[must_use]
    pub fn with(mut self, ty: &ComponentType) -> Self {
        self.and.push(ty.clone());
        self
    }

    /// Exclude `ty`.
    #[must_use]
    pub fn without(mut self, ty: &ComponentType) -> Self {
        self.not.push(ty.clone());
        self
    }

    /// A query requiring every type in `types`.
    #[must_use]
    pub fn all<'a>(types: impl IntoIterator<Item = &'a ComponentType>) -> Self {
        types.into_iter().fold(Self::new(), Self::with)
    }

    /// Types the query requires.
    #[must_use]
    pub fn required(&self) -> &[ComponentType] {
        &self.and
    }

    /// Types the query excludes.
    #[must_use]
    pub fn excluded(&self) -> &[ComponentType] {
        &self.not
    }

    /// Compiles the query against `registry`'s bit assignment.
    ///
    /// Unregistered excluded types are dropped, since no entity carries them.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if a required type was never
    /// registered.
    pub fn compile(&self, registry: &ComponentRegistry) -> Result<QueryMask> {
        let mut required = Mask::EMPTY;
        for ty in &self.and {
            required = required.with(registry.mask_of(ty)?);
        }
        let excluded = self
            .not
            .iter()
            .filter_map(|ty| registry.mask_of(ty).ok())
            .fold(Mask::EMPTY, Mask::with);
        Ok(QueryMask { required, excluded })
    }
}
