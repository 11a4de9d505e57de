//! # ecs_core
//!
//! Storage primitives for the bitmask ECS. Nothing in here knows about
//! systems or ticks; the `ecs_world` crate composes these pieces into the
//! public [`World`](../ecs_world/struct.World.html) surface.
//!
//! This crate provides:
//!
//! - [`ObjectPool`]: free-list backed slot allocator with O(1) release.
//! - [`Entity`] / [`EntityRegistry`]: recyclable `u64` entity identifiers.
//! - [`ComponentType`]: nominal component token plus default field template.
//! - [`ComponentRegistry`]: bit assignment and one pool per component type.
//! - [`Mask`]: 64-bit composition mask.
//! - [`ArchetypeIndex`]: mask-keyed partition of live entities.
//! - [`Query`] / [`QueryMask`]: required/excluded component filters.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod mask;
pub mod pool;
pub mod query;
pub mod registry;

pub use archetype::{ArchetypeIndex, ArchetypeSet};
pub use component::{ComponentType, ComponentTypeId, Fields};
pub use entity::{Entity, EntityRegistry};
pub use error::{EcsError, Result};
pub use mask::Mask;
pub use pool::{ObjectPool, PoolHandle};
pub use query::{Query, QueryMask};
pub use registry::ComponentRegistry;
