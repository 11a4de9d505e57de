//! Fixed-timestep tick loop.
//!
//! Each tick runs the schedule once against the world with a constant `dt`,
//! then optionally cleans the world every `clean_interval` ticks.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ecs_core::{EcsError, Result};

use crate::system::Schedule;
use crate::world::World;

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Run [`World::clean`] every this many ticks (0 = never).
    pub clean_interval: u64,
}

impl TickConfig {
    /// Duration of one tick at the configured rate.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] unless `tick_rate` is a positive number
    /// whose period fits in a [`Duration`].
    pub fn tick_duration(&self) -> Result<Duration> {
        let invalid = || {
            EcsError::InvalidConfig(format!(
                "tick_rate must be a positive number, got {}",
                self.tick_rate
            ))
        };
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(invalid());
        }
        Duration::try_from_secs_f64(1.0 / self.tick_rate).map_err(|_| invalid())
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
            clean_interval: 0,
        }
    }
}

/// Owns a world and the schedule that drives it.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    tick_duration: Duration,
    world: World,
    schedule: Schedule,
}

impl TickLoop {
    /// Create a loop that drives `world` with `schedule`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the tick rate is not usable.
    pub fn new(config: TickConfig, world: World, schedule: Schedule) -> Result<Self> {
        let tick_duration = config.tick_duration()?;
        Ok(Self {
            tick_id: 0,
            config,
            tick_duration,
            world,
            schedule,
        })
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// The world being driven.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Add or remove systems between ticks.
    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    /// Consume the loop and hand back the world.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Run one tick with time step `dt`.
    pub fn tick(&mut self, dt: f64) {
        self.tick_id += 1;
        let start = Instant::now();

        self.schedule.run(&mut self.world, dt);

        if self.config.clean_interval > 0 && self.tick_id % self.config.clean_interval == 0 {
            self.world.clean();
        }

        debug!(
            tick_id = self.tick_id,
            dt,
            entities = self.world.entity_count(),
            archetypes = self.world.archetype_count(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "tick complete"
        );
    }

    /// Run ticks at the configured rate until `max_ticks` is reached, or
    /// forever when it is 0.
    pub fn run(&mut self) {
        let tick_duration = self.tick_duration;
        let dt = tick_duration.as_secs_f64();
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            systems = self.schedule.len(),
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick(dt);

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
