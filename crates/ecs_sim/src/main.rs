//! # ecs_sim: headless particle simulation
//!
//! Drives an ECS [`World`] through a fixed-timestep [`TickLoop`]. A pool of
//! particles is spawned from a prototype entity, moved under gravity, and
//! respawned as their lifetimes expire.
//!
//! ## Configuration
//!
//! Read from `ECS_SIM_TICK_RATE`, `ECS_SIM_MAX_TICKS`, `ECS_SIM_PARTICLES`
//! and `ECS_SIM_POOL_CAPACITY`. Log verbosity follows `RUST_LOG`.

mod config;
mod particles;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecs_world::{Schedule, TickLoop, World};

use config::SimConfig;
use particles::{Aging, Movement, ParticleTypes, Spawner};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ecs_sim=info".parse()?))
        .init();

    let config = SimConfig::from_env()?;
    info!(
        particles = config.particles,
        tick_rate = config.tick.tick_rate,
        max_ticks = config.tick.max_ticks,
        pool_capacity = config.world.pool_capacity,
        "particle simulation starting"
    );

    let mut world = World::with_config(config.world.clone());
    let types = ParticleTypes::new()?;
    let prototype = types.spawn_prototype(&mut world)?;

    let schedule = Schedule::new()
        .with("spawn", Spawner::new(types.clone(), prototype, config.particles))
        .with("movement", Movement::new(types.clone()))
        .with("aging", Aging::new(types.clone()));

    let mut tick_loop = TickLoop::new(config.tick, world, schedule)?;
    tick_loop.run();

    let ticks = tick_loop.tick_id();
    let world = tick_loop.into_world();
    info!(
        ticks,
        entities = world.entity_count(),
        particles = world.query(&types.particles())?.len(),
        archetypes = world.archetype_count(),
        "particle simulation finished"
    );
    Ok(())
}
