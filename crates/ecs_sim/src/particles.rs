//! Particle components and the systems that move, age and respawn them.
//!
//! Particles are cloned from a prototype entity with [`World::copy_entity`],
//! pushed around by gravity, and deleted once their lifetime runs out.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use ecs_world::{ComponentType, Entity, Query, Result, System, World};

const GRAVITY: f64 = -9.81;
const LIFETIME: f64 = 2.0;
const SPEED: f64 = 5.0;
/// Spread successive launch angles evenly around the circle.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining: f64,
}

/// The component types every particle system shares.
#[derive(Debug, Clone)]
pub struct ParticleTypes {
    pub position: ComponentType,
    pub velocity: ComponentType,
    pub lifetime: ComponentType,
    pub prototype: ComponentType,
}

impl ParticleTypes {
    /// # Errors
    ///
    /// Only if a component template fails to serialise.
    pub fn new() -> Result<Self> {
        Ok(Self {
            position: ComponentType::from_value("Position", &Vec2::default())?,
            velocity: ComponentType::from_value("Velocity", &Vec2::default())?,
            lifetime: ComponentType::from_value("Lifetime", &Lifetime { remaining: LIFETIME })?,
            prototype: ComponentType::tag("Prototype"),
        })
    }

    /// Live particles, excluding the prototype.
    #[must_use]
    pub fn particles(&self) -> Query {
        Query::new()
            .with(&self.position)
            .with(&self.lifetime)
            .without(&self.prototype)
    }

    /// Spawn the prototype every particle is copied from.
    ///
    /// # Errors
    ///
    /// Propagates world errors.
    pub fn spawn_prototype(&self, world: &mut World) -> Result<Entity> {
        world.spawn([
            (&self.position, None),
            (&self.velocity, None),
            (&self.lifetime, None),
            (&self.prototype, None),
        ])
    }
}

/// Keeps the live particle count topped up to `target`.
pub struct Spawner {
    types: ParticleTypes,
    prototype: Entity,
    target: usize,
    spawned: u64,
}

impl Spawner {
    #[must_use]
    pub fn new(types: ParticleTypes, prototype: Entity, target: usize) -> Self {
        Self {
            types,
            prototype,
            target,
            spawned: 0,
        }
    }

    fn step(&mut self, world: &mut World) -> Result<()> {
        let live = world.query(&self.types.particles())?.len();
        for _ in live..self.target {
            let e = world.copy_entity(self.prototype, None)?;
            world.remove_component(e, &self.types.prototype)?;

            let angle = self.spawned as f64 * GOLDEN_ANGLE;
            world.add_component(
                e,
                &self.types.velocity,
                Some(json!({ "x": SPEED * angle.cos(), "y": SPEED * angle.sin() })),
            )?;
            self.spawned += 1;
        }
        Ok(())
    }
}

impl System for Spawner {
    fn run(&mut self, world: &mut World, _dt: f64) {
        if let Err(err) = self.step(world) {
            error!(%err, "spawner failed");
        }
    }
}

/// Applies gravity to velocity, then velocity to position.
pub struct Movement {
    types: ParticleTypes,
}

impl Movement {
    #[must_use]
    pub fn new(types: ParticleTypes) -> Self {
        Self { types }
    }

    fn step(&self, world: &mut World, dt: f64) -> Result<()> {
        let moving = Query::new()
            .with(&self.types.position)
            .with(&self.types.velocity)
            .without(&self.types.prototype);
        for e in world.query(&moving)? {
            let mut velocity: Vec2 = world.read_component(e, &self.types.velocity)?;
            let mut position: Vec2 = world.read_component(e, &self.types.position)?;
            velocity.y += GRAVITY * dt;
            position.x += velocity.x * dt;
            position.y += velocity.y * dt;

            world.add_component(e, &self.types.velocity, Some(json!(velocity)))?;
            world.add_component(e, &self.types.position, Some(json!(position)))?;
        }
        Ok(())
    }
}

impl System for Movement {
    fn run(&mut self, world: &mut World, dt: f64) {
        if let Err(err) = self.step(world, dt) {
            error!(%err, "movement failed");
        }
    }
}

/// Counts lifetimes down and deletes expired particles.
pub struct Aging {
    types: ParticleTypes,
    expired: u64,
}

impl Aging {
    #[must_use]
    pub fn new(types: ParticleTypes) -> Self {
        Self { types, expired: 0 }
    }

    fn step(&mut self, world: &mut World, dt: f64) -> Result<()> {
        for e in world.query(&self.types.particles())? {
            let mut lifetime: Lifetime = world.read_component(e, &self.types.lifetime)?;
            lifetime.remaining -= dt;
            if lifetime.remaining <= 0.0 {
                world.delete_entity(e)?;
                self.expired += 1;
            } else {
                world.add_component(e, &self.types.lifetime, Some(json!(lifetime)))?;
            }
        }
        debug!(expired = self.expired, "aging complete");
        Ok(())
    }
}

impl System for Aging {
    fn run(&mut self, world: &mut World, dt: f64) {
        if let Err(err) = self.step(world, dt) {
            error!(%err, "aging failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (World, ParticleTypes, Entity) {
        let mut world = World::new();
        let types = ParticleTypes::new().unwrap();
        let prototype = types.spawn_prototype(&mut world).unwrap();
        (world, types, prototype)
    }

    #[test]
    fn test_spawner_tops_up_to_target() {
        let (mut world, types, prototype) = setup();
        let mut spawner = Spawner::new(types.clone(), prototype, 8);

        spawner.run(&mut world, 0.1);
        assert_eq!(world.query(&types.particles()).unwrap().len(), 8);
        spawner.run(&mut world, 0.1);
        assert_eq!(world.query(&types.particles()).unwrap().len(), 8);
        assert!(world.has_component(prototype, &types.prototype));
    }

    #[test]
    fn test_movement_integrates_velocity() {
        let (mut world, types, _) = setup();
        let e = world
            .spawn([
                (&types.position, None),
                (&types.velocity, Some(json!({ "x": 1.0, "y": 0.0 }))),
            ])
            .unwrap();

        Movement::new(types.clone()).run(&mut world, 0.5);
        let position: Vec2 = world.read_component(e, &types.position).unwrap();
        assert!((position.x - 0.5).abs() < 1e-9);
        assert!(position.y < 0.0);
    }

    #[test]
    fn test_aging_deletes_expired_particles() {
        let (mut world, types, prototype) = setup();
        let e = world.copy_entity(prototype, None).unwrap();
        world.remove_component(e, &types.prototype).unwrap();

        let mut aging = Aging::new(types.clone());
        aging.run(&mut world, LIFETIME / 2.0);
        assert!(world.is_alive(e));
        aging.run(&mut world, LIFETIME);
        assert!(!world.is_alive(e));
        assert!(world.is_alive(prototype));
    }
}
