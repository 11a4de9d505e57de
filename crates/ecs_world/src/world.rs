//! The ECS world.
//!
//! [`World`] is the only way to mutate entities, component slots and
//! archetype membership. Every operation that changes an entity's mask moves
//! the entity between archetype sets before returning, so no caller can
//! observe one without the other.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use ecs_core::component::merge;
use ecs_core::{
    ArchetypeIndex, ComponentRegistry, ComponentType, EcsError, Entity, EntityRegistry, Fields,
    Mask, Query, QueryMask, Result,
};

use crate::config::WorldConfig;
use crate::system::System;

/// Entity registry, component registry and archetype index, kept in step.
///
/// # Invariants
///
/// For every live entity `e`:
///
/// - `e` is in exactly one archetype set, the one keyed by `mask(e)`;
/// - `e` holds a slot of component type `C` iff `mask(e)` has `C`'s bit.
#[derive(Debug)]
pub struct World {
    entities: EntityRegistry,
    components: ComponentRegistry,
    archetypes: ArchetypeIndex,
    /// Composition mask of each live entity. Doubles as the liveness check.
    masks: HashMap<Entity, Mask>,
    config: WorldConfig,
}

impl World {
    /// Create an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create an empty world tuned by `config`.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            entities: EntityRegistry::new(),
            components: ComponentRegistry::with_pool_capacity(config.pool_capacity),
            archetypes: ArchetypeIndex::new(),
            masks: HashMap::new(),
            config,
        }
    }

    /// The configuration this world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // -- Entity lifecycle --

    /// Create an entity with no components. It starts in the empty archetype.
    pub fn add_entity(&mut self) -> Entity {
        let entity = self.entities.create();
        self.masks.insert(entity, Mask::EMPTY);
        self.archetypes.insert(entity, Mask::EMPTY);
        trace!(%entity, "entity added");
        entity
    }

    /// Create an entity carrying the given components.
    ///
    /// All values are checked and all types registered before the entity is
    /// created, so a failure leaves no half-built entity behind.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidValues`] or [`EcsError::TooManyComponentTypes`].
    pub fn spawn<'a>(
        &mut self,
        components: impl IntoIterator<Item = (&'a ComponentType, Option<Value>)>,
    ) -> Result<Entity> {
        let mut prepared = Vec::new();
        for (ty, values) in components {
            let values = ty.validate(values)?;
            self.components.register(ty)?;
            prepared.push((ty, values));
        }

        let entity = self.add_entity();
        for (ty, values) in prepared {
            self.add_component(entity, ty, Some(Value::Object(values)))?;
        }
        Ok(entity)
    }

    /// Delete an entity, releasing every component slot it holds.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `entity` is not live.
    pub fn delete_entity(&mut self, entity: Entity) -> Result<()> {
        let mask = self.entity_mask(entity)?;
        self.components.remove_all(entity, mask)?;
        self.archetypes.remove(entity, mask);
        self.masks.remove(&entity);
        self.entities.destroy(entity);
        trace!(%entity, %mask, "entity deleted");
        Ok(())
    }

    /// Returns `true` if `entity` was created and not yet deleted.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.masks.contains_key(&entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    /// Live entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// Current composition mask of `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `entity` is not live.
    pub fn entity_mask(&self, entity: Entity) -> Result<Mask> {
        self.masks
            .get(&entity)
            .copied()
            .ok_or(EcsError::UnknownEntity(entity))
    }

    // -- Component types --

    /// Register `ty`, assigning it a bit if it has none yet.
    ///
    /// # Errors
    ///
    /// [`EcsError::TooManyComponentTypes`] once all mask bits are taken.
    pub fn register_component(&mut self, ty: &ComponentType) -> Result<Mask> {
        self.components.register(ty)
    }

    /// The bit assigned to `ty`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `ty` was never registered.
    pub fn component_mask(&self, ty: &ComponentType) -> Result<Mask> {
        self.components.mask_of(ty)
    }

    /// Registered component types in bit order.
    pub fn component_types(&self) -> impl Iterator<Item = &ComponentType> {
        self.components.types()
    }

    // -- Component operations --

    /// Attach `ty` to `entity` and merge `values` into the slot.
    ///
    /// If the entity already has the component, `values` are merged into the
    /// existing slot and the entity stays in its archetype. Otherwise the
    /// type is registered if needed, a slot is taken from the pool and reset
    /// to the type's defaults, and the entity moves to its new archetype.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`], [`EcsError::InvalidValues`] or
    /// [`EcsError::TooManyComponentTypes`]. Nothing changes on error.
    pub fn add_component(
        &mut self,
        entity: Entity,
        ty: &ComponentType,
        values: Option<Value>,
    ) -> Result<&mut Fields> {
        let mask = self.entity_mask(entity)?;
        let values = ty.validate(values)?;
        let bit = self.components.register(ty)?;

        let slot = self.components.add(entity, ty)?;
        if !mask.contains(bit) {
            let new = mask.with(bit);
            self.masks.insert(entity, new);
            self.archetypes.move_entity(entity, mask, new);
            trace!(%entity, component = ty.name(), "component added");
        }
        merge(slot, values);
        Ok(slot)
    }

    /// Detach `ty` from `entity`.
    ///
    /// Returns `false` (and does nothing) if the entity does not have it.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `entity` is not live.
    pub fn remove_component(&mut self, entity: Entity, ty: &ComponentType) -> Result<bool> {
        let mask = self.entity_mask(entity)?;
        let Ok(bit) = self.components.mask_of(ty) else {
            return Ok(false);
        };
        if !mask.intersects(bit) {
            return Ok(false);
        }

        self.components.remove(entity, ty)?;
        let new = mask.without(bit);
        self.masks.insert(entity, new);
        self.archetypes.move_entity(entity, mask, new);
        trace!(%entity, component = ty.name(), "component removed");
        Ok(true)
    }

    /// Returns `true` if `entity` is live and has `ty`.
    #[must_use]
    pub fn has_component(&self, entity: Entity, ty: &ComponentType) -> bool {
        match (self.masks.get(&entity), self.components.mask_of(ty)) {
            (Some(mask), Ok(bit)) => mask.intersects(bit),
            _ => false,
        }
    }

    /// Borrow `entity`'s `ty` slot.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`], [`EcsError::UnregisteredComponent`] or
    /// [`EcsError::ComponentNotPresent`].
    pub fn get_component(&self, entity: Entity, ty: &ComponentType) -> Result<&Fields> {
        self.entity_mask(entity)?;
        self.components.get(entity, ty)
    }

    /// Mutably borrow `entity`'s `ty` slot.
    ///
    /// # Errors
    ///
    /// Same as [`World::get_component`].
    pub fn get_component_mut(
        &mut self,
        entity: Entity,
        ty: &ComponentType,
    ) -> Result<&mut Fields> {
        self.entity_mask(entity)?;
        self.components.get_mut(entity, ty)
    }

    /// Deserialise `entity`'s `ty` slot into a Rust value.
    ///
    /// # Errors
    ///
    /// Same as [`World::get_component`], plus [`EcsError::InvalidValues`] if
    /// the slot does not deserialise into `T`.
    pub fn read_component<T: DeserializeOwned>(
        &self,
        entity: Entity,
        ty: &ComponentType,
    ) -> Result<T> {
        let fields = self.get_component(entity, ty)?;
        serde_json::from_value(Value::Object(fields.clone())).map_err(|e| {
            EcsError::InvalidValues {
                component: ty.name().to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Give `dest` a by-value copy of every component `src` has, and `src`'s
    /// mask.
    ///
    /// With `dest = None` a new entity is created. An existing `dest` loses
    /// any component `src` lacks. Returns the destination entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `src`, or a given `dest`, is not live.
    pub fn copy_entity(&mut self, src: Entity, dest: Option<Entity>) -> Result<Entity> {
        let src_mask = self.entity_mask(src)?;
        let (dest, dest_mask) = match dest {
            Some(dest) => (dest, self.entity_mask(dest)?),
            None => (self.add_entity(), Mask::EMPTY),
        };
        if dest == src {
            return Ok(dest);
        }

        self.components.remove_all(dest, dest_mask.without(src_mask))?;
        let copied = self.components.copy(src, dest)?;
        debug_assert_eq!(copied, src_mask);
        self.masks.insert(dest, src_mask);
        self.archetypes.move_entity(dest, dest_mask, src_mask);
        trace!(%src, %dest, mask = %src_mask, "entity copied");
        Ok(dest)
    }

    // -- Queries --

    /// Entities having every `with` type and no `without` type.
    ///
    /// The result is a snapshot: later mutations do not change it, and
    /// entities in it may have been deleted by the time they are visited.
    /// Within one archetype, entities come back in the order they joined it.
    /// Excluded types that were never registered are ignored.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if a required type was never
    /// registered.
    pub fn query(&self, query: &Query) -> Result<Vec<Entity>> {
        let mask = query.compile(&self.components)?;
        Ok(self.archetypes.query(&mask))
    }

    /// [`World::query`] with pre-compiled masks.
    #[must_use]
    pub fn query_mask(&self, mask: &QueryMask) -> Vec<Entity> {
        self.archetypes.query(mask)
    }

    // -- Systems --

    /// Run each system once, in order, passing this world and `dt`.
    ///
    /// Later systems observe every mutation made by earlier ones.
    pub fn update(&mut self, dt: f64, systems: &mut [Box<dyn System>]) {
        for system in systems.iter_mut() {
            trace!(system = system.name(), "running system");
            system.run(self, dt);
        }
    }

    // -- Housekeeping --

    /// Shrink sparse component pools and, if configured, drop empty
    /// archetype sets. Returns `(slots dropped, archetypes pruned)`.
    pub fn clean(&mut self) -> (usize, usize) {
        let slots = self.components.clean();
        let archetypes = if self.config.prune_empty_archetypes {
            self.archetypes.prune()
        } else {
            0
        };
        debug!(slots, archetypes, "world cleaned");
        (slots, archetypes)
    }

    /// Number of archetype sets, including empty ones not yet pruned.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.archetype_count()
    }

    /// Read-only view of the archetype index.
    #[must_use]
    pub fn archetypes(&self) -> &ArchetypeIndex {
        &self.archetypes
    }

    /// Read-only view of the component registry.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    fn position() -> ComponentType {
        ComponentType::new("Position", json!({ "x": 0, "y": 0 })).unwrap()
    }

    fn velocity() -> ComponentType {
        ComponentType::new("Velocity", json!({ "x": 0, "y": 0 })).unwrap()
    }

    #[test]
    fn test_add_entity_starts_in_empty_archetype() {
        let mut world = World::new();
        let e = world.add_entity();
        assert!(world.is_alive(e));
        assert_eq!(world.entity_mask(e), Ok(Mask::EMPTY));
        assert!(world.archetypes().get(Mask::EMPTY).unwrap().contains(e));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_add_component_merges_onto_defaults() {
        let mut world = World::new();
        let pos = position();
        let e = world.add_entity();

        world.add_component(e, &pos, Some(json!({ "x": 1 }))).unwrap();
        assert_eq!(
            Value::Object(world.get_component(e, &pos).unwrap().clone()),
            json!({ "x": 1, "y": 0 })
        );
    }

    #[test]
    fn test_add_present_component_merges_without_move() {
        let mut world = World::new();
        let pos = position();
        let e = world.add_entity();
        world.add_component(e, &pos, Some(json!({ "x": 1, "y": 2 }))).unwrap();
        let archetypes = world.archetype_count();

        world.add_component(e, &pos, Some(json!({ "y": 5 }))).unwrap();
        assert_eq!(world.get_component(e, &pos).unwrap()["x"], json!(1));
        assert_eq!(world.get_component(e, &pos).unwrap()["y"], json!(5));
        assert_eq!(world.archetype_count(), archetypes);
        assert_eq!(world.components().active_count(&pos), Ok(1));
    }

    #[test]
    fn test_invalid_values_leave_world_untouched() {
        let mut world = World::new();
        let pos = position();
        let e = world.add_entity();

        let err = world.add_component(e, &pos, Some(json!({ "z": 1 }))).unwrap_err();
        assert!(matches!(err, EcsError::InvalidValues { .. }));
        assert!(!world.has_component(e, &pos));
        assert_eq!(world.entity_mask(e), Ok(Mask::EMPTY));
    }

    #[test]
    fn test_operations_on_dead_entity_fail() {
        let mut world = World::new();
        let pos = position();
        let e = world.add_entity();
        world.delete_entity(e).unwrap();

        assert_eq!(world.delete_entity(e), Err(EcsError::UnknownEntity(e)));
        assert_eq!(
            world.add_component(e, &pos, None).map(|_| ()),
            Err(EcsError::UnknownEntity(e))
        );
        assert_eq!(world.remove_component(e, &pos), Err(EcsError::UnknownEntity(e)));
        assert_eq!(world.copy_entity(e, None), Err(EcsError::UnknownEntity(e)));
        assert!(!world.has_component(e, &pos));
    }

    #[test]
    fn test_remove_component_is_idempotent() {
        let mut world = World::new();
        let pos = position();
        let e = world.add_entity();
        world.add_component(e, &pos, None).unwrap();

        assert_eq!(world.remove_component(e, &pos), Ok(true));
        assert_eq!(world.remove_component(e, &pos), Ok(false));
        assert_eq!(world.entity_mask(e), Ok(Mask::EMPTY));
        // Never registered at all.
        assert_eq!(world.remove_component(e, &velocity()), Ok(false));
    }

    #[test]
    fn test_delete_entity_releases_slots() {
        let mut world = World::new();
        let (pos, vel) = (position(), velocity());
        let e = world.spawn([(&pos, None), (&vel, None)]).unwrap();

        world.delete_entity(e).unwrap();
        assert_eq!(world.components().active_count(&pos), Ok(0));
        assert_eq!(world.components().active_count(&vel), Ok(0));
        assert!(world.query(&Query::new()).unwrap().is_empty());
    }

    #[test]
    fn test_copy_into_existing_entity_replaces_composition() {
        let mut world = World::new();
        let (pos, vel) = (position(), velocity());
        let src = world.spawn([(&pos, Some(json!({ "x": 7 })))]).unwrap();
        let dest = world.spawn([(&vel, None)]).unwrap();

        assert_eq!(world.copy_entity(src, Some(dest)), Ok(dest));
        assert!(world.has_component(dest, &pos));
        assert!(!world.has_component(dest, &vel));
        assert_eq!(world.entity_mask(dest), world.entity_mask(src));
        assert_eq!(world.get_component(dest, &pos).unwrap()["x"], json!(7));
        assert_eq!(world.components().active_count(&vel), Ok(0));
    }

    #[test]
    fn test_copy_onto_itself_is_noop() {
        let mut world = World::new();
        let pos = position();
        let e = world.spawn([(&pos, None)]).unwrap();
        assert_eq!(world.copy_entity(e, Some(e)), Ok(e));
        assert_eq!(world.components().active_count(&pos), Ok(1));
    }

    #[test]
    fn test_spawn_rejects_bad_values_before_creating() {
        let mut world = World::new();
        let pos = position();
        let result = world.spawn([(&pos, Some(json!({ "nope": true })))]);
        assert!(result.is_err());
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_read_component_into_struct() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Health {
            current: u32,
            max: u32,
        }

        let mut world = World::new();
        let health = ComponentType::from_value("Health", &Health { current: 10, max: 10 }).unwrap();
        let e = world.spawn([(&health, Some(json!({ "current": 3 })))]).unwrap();

        let read: Health = world.read_component(e, &health).unwrap();
        assert_eq!(read, Health { current: 3, max: 10 });
        assert!(world.read_component::<String>(e, &health).is_err());
    }

    #[test]
    fn test_update_runs_systems_in_order() {
        let mut world = World::new();
        let pos = position();
        let e = world.spawn([(&pos, None)]).unwrap();

        let p1 = pos.clone();
        let p2 = pos.clone();
        let mut systems: Vec<Box<dyn System>> = vec![
            Box::new(move |w: &mut World, _dt: f64| {
                for e in w.query(&Query::new().with(&p1)).unwrap() {
                    w.get_component_mut(e, &p1).unwrap().insert("x".into(), json!(1));
                }
            }) as Box<dyn System>,
            Box::new(move |w: &mut World, _dt: f64| {
                for e in w.query(&Query::new().with(&p2)).unwrap() {
                    let x = w.get_component(e, &p2).unwrap()["x"].as_i64().unwrap();
                    w.get_component_mut(e, &p2).unwrap().insert("y".into(), json!(x * 10));
                }
            }) as Box<dyn System>,
        ];

        world.update(0.016, &mut systems);
        assert_eq!(world.get_component(e, &pos).unwrap()["y"], json!(10));
    }

    #[test]
    fn test_clean_prunes_empty_archetypes_when_configured() {
        let pos = position();

        let mut world = World::new();
        let e = world.spawn([(&pos, None)]).unwrap();
        world.delete_entity(e).unwrap();
        let (_, pruned) = world.clean();
        assert_eq!(pruned, 2);
        assert_eq!(world.archetype_count(), 0);

        let mut world = World::with_config(WorldConfig::default().with_pruning(false));
        let e = world.spawn([(&pos, None)]).unwrap();
        world.delete_entity(e).unwrap();
        assert_eq!(world.clean().1, 0);
        assert_eq!(world.archetype_count(), 2);
    }

    #[test]
    fn test_pool_capacity_from_config() {
        let pos = position();
        let mut world = World::with_config(WorldConfig::default().with_pool_capacity(16));
        world.register_component(&pos).unwrap();
        assert_eq!(world.components().pool_capacity(&pos), Ok(16));
    }

    #[test]
    fn test_query_requiring_unregistered_type_fails() {
        let mut world = World::new();
        let pos = position();
        let ghost = ComponentType::tag("Ghost");
        let e = world.spawn([(&pos, None)]).unwrap();

        assert_eq!(
            world.query(&Query::new().with(&ghost)),
            Err(EcsError::UnregisteredComponent("Ghost".into()))
        );
        assert_eq!(world.query(&Query::new().with(&pos).without(&ghost)), Ok(vec![e]));
    }

    #[test]
    fn test_query_mask_uses_precompiled_bits() {
        let mut world = World::new();
        let (pos, vel) = (position(), velocity());
        let both = world.spawn([(&pos, None), (&vel, None)]).unwrap();
        let only_pos = world.spawn([(&pos, None)]).unwrap();

        let pos_bit = world.component_mask(&pos).unwrap();
        let vel_bit = world.component_mask(&vel).unwrap();
        let both_mask = QueryMask::new(pos_bit.with(vel_bit), Mask::EMPTY);
        assert_eq!(world.query_mask(&both_mask), vec![both]);
        assert_eq!(world.query_mask(&QueryMask::new(pos_bit, vel_bit)), vec![only_pos]);
    }

    #[test]
    fn test_component_types_in_bit_order() {
        let mut world = World::new();
        let (pos, vel) = (position(), velocity());
        world.register_component(&vel).unwrap();
        world.register_component(&pos).unwrap();
        world.register_component(&vel).unwrap();

        let names: Vec<&str> = world.component_types().map(ComponentType::name).collect();
        assert_eq!(names, vec!["Velocity", "Position"]);
    }

    #[test]
    fn test_query_order_survives_deletion() {
        let mut world = World::new();
        let pos = position();
        let entities: Vec<Entity> = (0..4).map(|_| world.spawn([(&pos, None)]).unwrap()).collect();

        world.delete_entity(entities[0]).unwrap();
        assert_eq!(world.query(&Query::new().with(&pos)), Ok(entities[1..].to_vec()));
    }
}
