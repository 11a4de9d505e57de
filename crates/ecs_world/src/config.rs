//! World configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Slots each component pool constructs when its type is registered.
    pub pool_capacity: usize,
    /// Whether [`World::clean`](crate::World::clean) drops empty archetype
    /// sets in addition to shrinking pools.
    pub prune_empty_archetypes: bool,
}

impl WorldConfig {
    /// Pre-build `capacity` slots per component pool.
    #[must_use]
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Whether [`World::clean`](crate::World::clean) drops empty archetypes.
    #[must_use]
    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.prune_empty_archetypes = prune;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 0,
            prune_empty_archetypes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = WorldConfig::default()
            .with_pool_capacity(256)
            .with_pruning(false);
        assert_eq!(config.pool_capacity, 256);
        assert!(!config.prune_empty_archetypes);
    }

    #[test]
    fn test_config_deserialises_from_json() {
        let config: WorldConfig =
            serde_json::from_str(r#"{ "pool_capacity": 64, "prune_empty_archetypes": true }"#)
                .unwrap();
        assert_eq!(config, WorldConfig::default().with_pool_capacity(64));
    }
}
