//! Component registry: bit assignment and pooled storage per component type.
//!
//! Bits are handed out sequentially from 0 in registration order, so the
//! registry doubles as the bit → type lookup table.

use std::collections::HashMap;

use tracing::debug;

use crate::component::{ComponentType, ComponentTypeId, Fields};
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::mask::Mask;
use crate::pool::{ObjectPool, PoolHandle};

/// Pools are shrunk once their active count drops below
/// `capacity / SHRINK_RATIO`.
const SHRINK_RATIO: usize = 4;

/// Storage for one registered component type.
#[derive(Debug)]
struct Storage {
    ty: ComponentType,
    bit: Mask,
    pool: ObjectPool<Fields>,
    /// Slot held by each entity carrying this component.
    owners: HashMap<Entity, PoolHandle>,
}

impl Storage {
    fn slot(&self, entity: Entity) -> Result<PoolHandle> {
        self.owners
            .get(&entity)
            .copied()
            .ok_or_else(|| EcsError::ComponentNotPresent {
                entity,
                component: self.ty.name().to_string(),
            })
    }
}

/// Owns the bit assignment and one [`ObjectPool`] per component type.
///
/// The registry does not maintain composition masks; the world keeps those
/// in step with the slots held here.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Indexed by bit position.
    storages: Vec<Storage>,
    bits: HashMap<ComponentTypeId, usize>,
    /// Slots pre-built by each new pool.
    pool_capacity: usize,
}

impl ComponentRegistry {
    /// An empty registry whose pools start with no slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose pools each start with `capacity` slots.
    #[must_use]
    pub fn with_pool_capacity(capacity: usize) -> Self {
        Self {
            pool_capacity: capacity,
            ..Self::default()
        }
    }

    /// Registers `ty`, assigning it the next free bit.
    ///
    /// Registering the same type again returns the bit it already has.
    ///
    /// # Errors
    ///
    /// [`EcsError::TooManyComponentTypes`] once all mask bits are taken.
    pub fn register(&mut self, ty: &ComponentType) -> Result<Mask> {
        if let Some(&index) = self.bits.get(&ty.id()) {
            return Ok(self.storages[index].bit);
        }
        let index = self.storages.len();
        if index >= Mask::BITS as usize {
            return Err(EcsError::TooManyComponentTypes { limit: Mask::BITS });
        }

        let template = ty.clone();
        let bit = Mask::bit(index as u32);
        self.storages.push(Storage {
            ty: ty.clone(),
            bit,
            pool: ObjectPool::with_capacity(self.pool_capacity, move || template.instantiate()),
            owners: HashMap::new(),
        });
        self.bits.insert(ty.id(), index);

        debug!(component = ty.name(), bit = index, "registered component type");
        Ok(bit)
    }

    /// Returns `true` if `ty` has a bit.
    #[must_use]
    pub fn is_registered(&self, ty: &ComponentType) -> bool {
        self.bits.contains_key(&ty.id())
    }

    /// The single-bit mask assigned to `ty`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `ty` was never registered.
    pub fn mask_of(&self, ty: &ComponentType) -> Result<Mask> {
        self.storage(ty).map(|s| s.bit)
    }

    fn storage(&self, ty: &ComponentType) -> Result<&Storage> {
        self.bits
            .get(&ty.id())
            .map(|&index| &self.storages[index])
            .ok_or_else(|| EcsError::UnregisteredComponent(ty.name().to_string()))
    }

    fn storage_mut(&mut self, ty: &ComponentType) -> Result<&mut Storage> {
        match self.bits.get(&ty.id()) {
            Some(&index) => Ok(&mut self.storages[index]),
            None => Err(EcsError::UnregisteredComponent(ty.name().to_string())),
        }
    }

    /// Attaches a slot of `ty` to `entity`, reset to the type's defaults.
    ///
    /// If the entity already holds a slot of this type, that slot is
    /// returned untouched.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `ty` was never registered.
    pub fn add(&mut self, entity: Entity, ty: &ComponentType) -> Result<&mut Fields> {
        let storage = self.storage_mut(ty)?;
        let handle = match storage.owners.get(&entity) {
            Some(&handle) => handle,
            None => {
                let handle = storage.pool.acquire();
                storage.ty.reset(storage.pool.get_mut(handle)?);
                storage.owners.insert(entity, handle);
                handle
            }
        };
        storage.pool.get_mut(handle)
    }

    /// Detaches `entity`'s slot of `ty` and returns it to the pool.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] or
    /// [`EcsError::ComponentNotPresent`].
    pub fn remove(&mut self, entity: Entity, ty: &ComponentType) -> Result<()> {
        let storage = self.storage_mut(ty)?;
        let handle = storage.slot(entity)?;
        storage.pool.release(handle)?;
        storage.owners.remove(&entity);
        Ok(())
    }

    /// Releases every slot `entity` holds among the types named by `mask`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentNotPresent`] if a named slot is missing, which
    /// means the caller's mask is out of step with the registry.
    pub fn remove_all(&mut self, entity: Entity, mask: Mask) -> Result<()> {
        for bit in mask.bits() {
            let Some(storage) = self.storages.get_mut(bit as usize) else {
                continue;
            };
            let handle = storage.slot(entity)?;
            storage.pool.release(handle)?;
            storage.owners.remove(&entity);
        }
        Ok(())
    }

    /// Borrows `entity`'s slot of `ty`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] or
    /// [`EcsError::ComponentNotPresent`].
    pub fn get(&self, entity: Entity, ty: &ComponentType) -> Result<&Fields> {
        let storage = self.storage(ty)?;
        storage.pool.get(storage.slot(entity)?)
    }

    /// Mutably borrows `entity`'s slot of `ty`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] or
    /// [`EcsError::ComponentNotPresent`].
    pub fn get_mut(&mut self, entity: Entity, ty: &ComponentType) -> Result<&mut Fields> {
        let storage = self.storage_mut(ty)?;
        let handle = storage.slot(entity)?;
        storage.pool.get_mut(handle)
    }

    /// Returns `true` if `entity` holds a slot of `ty`. Unregistered types
    /// are never present.
    #[must_use]
    pub fn has(&self, entity: Entity, ty: &ComponentType) -> bool {
        self.storage(ty)
            .map(|s| s.owners.contains_key(&entity))
            .unwrap_or(false)
    }

    /// Deep-copies every component `src` holds onto `dest`, attaching slots
    /// to `dest` where it lacks them.
    ///
    /// Components `dest` holds that `src` lacks are left alone. Returns the
    /// mask of the copied types.
    ///
    /// # Errors
    ///
    /// Only on internal pool inconsistency ([`EcsError::InvalidHandle`]).
    pub fn copy(&mut self, src: Entity, dest: Entity) -> Result<Mask> {
        let mut copied = Mask::EMPTY;
        for storage in &mut self.storages {
            let Some(&from) = storage.owners.get(&src) else {
                continue;
            };
            copied = copied.with(storage.bit);
            if src == dest {
                continue;
            }
            let values = storage.pool.get(from)?.clone();
            let to = match storage.owners.get(&dest) {
                Some(&handle) => handle,
                None => {
                    let handle = storage.pool.acquire();
                    storage.owners.insert(dest, handle);
                    handle
                }
            };
            *storage.pool.get_mut(to)? = values;
        }
        Ok(copied)
    }

    /// Shrinks pools whose active count is far below their reserved
    /// capacity. Returns the number of slots dropped across all pools.
    pub fn clean(&mut self) -> usize {
        let mut dropped = 0;
        for storage in &mut self.storages {
            let capacity = storage.pool.capacity();
            if storage.pool.active_count() * SHRINK_RATIO < capacity {
                let n = storage.pool.shrink();
                if n > 0 {
                    debug!(
                        component = storage.ty.name(),
                        dropped = n,
                        active = storage.pool.active_count(),
                        "shrank component pool"
                    );
                }
                dropped += n;
            }
        }
        dropped
    }

    /// Registered types in bit order.
    pub fn types(&self) -> impl Iterator<Item = &ComponentType> {
        self.storages.iter().map(|s| &s.ty)
    }

    /// Number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.storages.len()
    }

    /// The type holding bit position `bit`.
    #[must_use]
    pub fn type_at(&self, bit: u32) -> Option<&ComponentType> {
        self.storages.get(bit as usize).map(|s| &s.ty)
    }

    /// Slots of `ty` currently attached to entities.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `ty` was never registered.
    pub fn active_count(&self, ty: &ComponentType) -> Result<usize> {
        self.storage(ty).map(|s| s.pool.active_count())
    }

    /// Constructed slots of `ty`, active or free.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `ty` was never registered.
    pub fn pool_capacity(&self, ty: &ComponentType) -> Result<usize> {
        self.storage(ty).map(|s| s.pool.capacity())
    }
}
