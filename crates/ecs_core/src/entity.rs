//! Entity type and id recycling.
//!
//! An [`Entity`] is a lightweight `u64` identifier with no inherent data.
//! Each world owns one [`EntityRegistry`], so ids from different worlds never
//! interfere with each other.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers. Components attached through the world give
/// them meaning. An id is only unique while the entity is alive: once deleted
/// it may be handed out again to an unrelated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// The null / invalid entity sentinel. Never issued by a registry.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    fn slot(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Issues entity ids, recycling destroyed ones before minting new ones.
///
/// Fresh ids are drawn from a monotonically increasing counter starting at 1
/// (0 is reserved for [`Entity::INVALID`]). Destroyed ids go onto a LIFO free
/// list and are reused first.
#[derive(Debug)]
pub struct EntityRegistry {
    next_id: u64,
    free: Vec<Entity>,
    /// Liveness flag per raw id; index 0 is the sentinel and stays `false`.
    alive: Vec<bool>,
    live_count: usize,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            free: Vec::new(),
            alive: vec![false],
            live_count: 0,
        }
    }

    /// Returns an id that is not currently live.
    pub fn create(&mut self) -> Entity {
        let entity = match self.free.pop() {
            Some(recycled) => recycled,
            None => {
                let fresh = Entity(self.next_id);
                self.next_id += 1;
                self.alive.push(false);
                fresh
            }
        };
        self.alive[entity.slot()] = true;
        self.live_count += 1;
        entity
    }

    /// Marks `entity` dead and queues its id for reuse.
    ///
    /// Returns `false` without touching any state if the id is not live.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.alive[entity.slot()] = false;
        self.live_count -= 1;
        self.free.push(entity);
        true
    }

    /// Returns `true` if `entity` was created and not yet destroyed.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.slot()).copied().unwrap_or(false)
    }

    /// Number of currently live entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Iterates live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(id, _)| Entity(id as u64))
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
