//! Simulation configuration read from the environment.

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ecs_world::{TickConfig, WorldConfig};

/// Ticks per second. Defaults to 60.
pub const TICK_RATE_ENV: &str = "ECS_SIM_TICK_RATE";
/// Ticks to run before exiting; 0 runs forever. Defaults to 600.
pub const MAX_TICKS_ENV: &str = "ECS_SIM_MAX_TICKS";
/// Number of live particles the spawner keeps topped up. Defaults to 256.
pub const PARTICLES_ENV: &str = "ECS_SIM_PARTICLES";
/// Slots pre-built per component pool. Defaults to the particle count.
pub const POOL_CAPACITY_ENV: &str = "ECS_SIM_POOL_CAPACITY";

/// Everything the simulation needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub tick: TickConfig,
    pub world: WorldConfig,
    /// Live particles the spawner maintains.
    pub particles: usize,
}

impl SimConfig {
    /// Read the configuration from `ECS_SIM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a value does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a value does not parse, or
    /// if the tick rate is not positive.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tick_rate: f64 = parse(&lookup, TICK_RATE_ENV)?.unwrap_or(60.0);
        anyhow::ensure!(
            tick_rate.is_finite() && tick_rate > 0.0,
            "{TICK_RATE_ENV} must be a positive number, got {tick_rate}"
        );
        let max_ticks = parse(&lookup, MAX_TICKS_ENV)?.unwrap_or(600);
        let particles = parse(&lookup, PARTICLES_ENV)?.unwrap_or(256);
        let pool_capacity = parse(&lookup, POOL_CAPACITY_ENV)?.unwrap_or(particles);

        Ok(Self {
            tick: TickConfig {
                tick_rate,
                max_ticks,
                clean_interval: tick_rate.ceil() as u64,
            },
            world: WorldConfig::default().with_pool_capacity(pool_capacity),
            particles,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {key}: {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<SimConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SimConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_pairs(&[]).unwrap();
        assert!((config.tick.tick_rate - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.tick.max_ticks, 600);
        assert_eq!(config.tick.clean_interval, 60);
        assert_eq!(config.particles, 256);
        assert_eq!(config.world.pool_capacity, 256);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = from_pairs(&[
            (TICK_RATE_ENV, "30"),
            (MAX_TICKS_ENV, "0"),
            (PARTICLES_ENV, " 10 "),
            (POOL_CAPACITY_ENV, "4"),
        ])
        .unwrap();
        assert_eq!(config.tick.max_ticks, 0);
        assert_eq!(config.tick.clean_interval, 30);
        assert_eq!(config.particles, 10);
        assert_eq!(config.world.pool_capacity, 4);
    }

    #[test]
    fn test_bad_value_names_the_variable() {
        let err = from_pairs(&[(PARTICLES_ENV, "lots")]).unwrap_err();
        assert!(err.to_string().contains(PARTICLES_ENV));

        let err = from_pairs(&[(TICK_RATE_ENV, "0")]).unwrap_err();
        assert!(err.to_string().contains(TICK_RATE_ENV));
    }
}
