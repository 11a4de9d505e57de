//! # ecs_world
//!
//! The public surface of the bitmask ECS. A [`World`] composes an entity
//! registry, a component registry and an archetype index, and keeps the three
//! in step on every mutation.
//!
//! Systems are plain functions over the world, run in order by
//! [`World::update`], a [`Schedule`], or a fixed-timestep [`TickLoop`].
//!
//! ## Usage
//!
//! ```rust
//! use ecs_world::{ComponentType, Query, World};
//! use serde_json::json;
//!
//! let position = ComponentType::new("Position", json!({ "x": 0.0, "y": 0.0 })).unwrap();
//! let velocity = ComponentType::new("Velocity", json!({ "x": 0.0, "y": 0.0 })).unwrap();
//!
//! let mut world = World::new();
//! let e = world.add_entity();
//! world.add_component(e, &position, Some(json!({ "x": 1.0 }))).unwrap();
//! world.add_component(e, &velocity, Some(json!({ "x": 2.0 }))).unwrap();
//!
//! let moving = Query::new().with(&position).with(&velocity);
//! assert_eq!(world.query(&moving).unwrap(), vec![e]);
//! ```

pub mod config;
pub mod system;
pub mod tick;
pub mod world;

pub use config::WorldConfig;
pub use system::{Schedule, System};
pub use tick::{TickConfig, TickLoop};
pub use world::World;

pub use ecs_core::{ComponentType, EcsError, Entity, Fields, Mask, Query, Result};
