//! Archetype index.
//!
//! An archetype is the set of entities sharing one exact composition mask.
//! The [`ArchetypeIndex`] partitions every live entity into these sets, keyed
//! by the mask itself, and answers queries by matching keys instead of
//! visiting entities.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::entity::Entity;
use crate::mask::Mask;
use crate::query::QueryMask;

/// The entities of one archetype, in insertion order.
///
/// Removal leaves a hole in the dense list instead of moving another member
/// into it, so survivors keep their relative order for the set's lifetime.
/// Holes are compacted away once they outnumber the members.
#[derive(Debug, Clone, Default)]
pub struct ArchetypeSet {
    /// Dense list; `None` marks a removed member.
    slots: Vec<Option<Entity>>,
    rows: HashMap<Entity, usize>,
}

impl ArchetypeSet {
    fn insert(&mut self, entity: Entity) -> bool {
        if self.rows.contains_key(&entity) {
            return false;
        }
        self.rows.insert(entity, self.slots.len());
        self.slots.push(Some(entity));
        true
    }

    fn remove(&mut self, entity: Entity) -> bool {
        let Some(row) = self.rows.remove(&entity) else {
            return false;
        };
        self.slots[row] = None;
        if self.slots.len() > 2 * self.rows.len() {
            self.compact();
        }
        true
    }

    /// Drops holes and renumbers rows. Order is unchanged.
    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (row, entity) in self.slots.iter().flatten().enumerate() {
            self.rows.insert(*entity, row);
        }
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Members in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().flatten().copied()
    }
}

/// Mask-keyed partition of live entities.
#[derive(Debug, Default)]
pub struct ArchetypeIndex {
    sets: HashMap<Mask, ArchetypeSet>,
}

impl ArchetypeIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set_mut(&mut self, mask: Mask) -> &mut ArchetypeSet {
        self.sets.entry(mask).or_insert_with(|| {
            debug!(%mask, "new archetype");
            ArchetypeSet::default()
        })
    }

    /// Places `entity` in the set keyed by `mask`.
    pub fn insert(&mut self, entity: Entity, mask: Mask) {
        let inserted = self.set_mut(mask).insert(entity);
        debug_assert!(inserted, "{entity} already in archetype {mask}");
    }

    /// Takes `entity` out of the set keyed by `mask`.
    ///
    /// Returns `false` if it was not there.
    pub fn remove(&mut self, entity: Entity, mask: Mask) -> bool {
        self.sets
            .get_mut(&mask)
            .is_some_and(|set| set.remove(entity))
    }

    /// Moves `entity` from the `old` set to the `new` set.
    ///
    /// Call exactly once per mask change, right after the mask is written.
    pub fn move_entity(&mut self, entity: Entity, old: Mask, new: Mask) {
        if old == new {
            return;
        }
        let removed = self.remove(entity, old);
        debug_assert!(removed, "{entity} missing from archetype {old}");
        self.insert(entity, new);
        trace!(%entity, from = %old, to = %new, "archetype move");
    }

    /// Every entity in every archetype matched by `query`, as a fresh list.
    ///
    /// The result does not track later changes to the index.
    #[must_use]
    pub fn query(&self, query: &QueryMask) -> Vec<Entity> {
        let mut out = Vec::new();
        for (_, set) in self.matching(query) {
            out.extend(set.entities());
        }
        out
    }

    /// Non-empty archetypes whose key `query` matches.
    pub fn matching<'a>(
        &'a self,
        query: &'a QueryMask,
    ) -> impl Iterator<Item = (Mask, &'a ArchetypeSet)> + 'a {
        self.sets
            .iter()
            .filter(move |(mask, set)| !set.is_empty() && query.matches(**mask))
            .map(|(mask, set)| (*mask, set))
    }

    /// The set keyed by `mask`, if one has been created.
    #[must_use]
    pub fn get(&self, mask: Mask) -> Option<&ArchetypeSet> {
        self.sets.get(&mask)
    }

    /// Number of entities currently keyed by `mask`.
    #[must_use]
    pub fn len_of(&self, mask: Mask) -> usize {
        self.sets.get(&mask).map_or(0, ArchetypeSet::len)
    }

    /// Number of archetype sets, including empty ones not yet pruned.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.sets.len()
    }

    /// All archetype sets, in no particular order.
    pub fn archetypes(&self) -> impl Iterator<Item = (Mask, &ArchetypeSet)> {
        self.sets.iter().map(|(mask, set)| (*mask, set))
    }

    /// Drops empty archetype sets. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.sets.len();
        self.sets.retain(|_, set| !set.is_empty());
        before - self.sets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Mask = Mask(0b001);
    const B: Mask = Mask(0b010);
    const C: Mask = Mask(0b100);

    fn e(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    fn sorted(mut v: Vec<Entity>) -> Vec<Entity> {
        v.sort();
        v
    }

    #[test]
    fn test_move_entity_between_sets() {
        let mut index = ArchetypeIndex::new();
        index.insert(e(1), Mask::EMPTY);
        index.move_entity(e(1), Mask::EMPTY, A);

        assert_eq!(index.len_of(Mask::EMPTY), 0);
        assert!(index.get(A).unwrap().contains(e(1)));
        assert_eq!(index.archetype_count(), 2);
    }

    #[test]
    fn test_move_to_same_mask_is_noop() {
        let mut index = ArchetypeIndex::new();
        index.insert(e(1), A);
        index.move_entity(e(1), A, A);
        assert_eq!(index.len_of(A), 1);
    }

    #[test]
    fn test_remove_keeps_survivor_order() {
        let mut index = ArchetypeIndex::new();
        for id in 1..=4 {
            index.insert(e(id), A);
        }
        assert!(index.remove(e(1), A));
        let order: Vec<_> = index.get(A).unwrap().entities().collect();
        assert_eq!(order, vec![e(2), e(3), e(4)]);

        assert!(index.remove(e(3), A));
        assert!(!index.remove(e(3), A));
        let set = index.get(A).unwrap();
        assert_eq!(set.entities().collect::<Vec<_>>(), vec![e(2), e(4)]);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(e(1)));
    }

    #[test]
    fn test_compaction_preserves_order_and_rows() {
        let mut index = ArchetypeIndex::new();
        for id in 1..=10 {
            index.insert(e(id), A);
        }
        // Enough removals to trigger compaction at least once.
        for id in [1, 2, 4, 5, 7, 8] {
            assert!(index.remove(e(id), A));
        }
        assert_eq!(
            index.get(A).unwrap().entities().collect::<Vec<_>>(),
            vec![e(3), e(6), e(9), e(10)]
        );

        // Rows were renumbered: later removals and inserts still line up.
        assert!(index.remove(e(9), A));
        index.insert(e(11), A);
        assert_eq!(
            index.get(A).unwrap().entities().collect::<Vec<_>>(),
            vec![e(3), e(6), e(10), e(11)]
        );
    }

    #[test]
    fn test_query_matches_required_and_excluded() {
        let mut index = ArchetypeIndex::new();
        index.insert(e(1), A);
        index.insert(e(2), A.with(B));
        index.insert(e(3), A.with(B).with(C));
        index.insert(e(4), B);

        let q = QueryMask::new(A, Mask::EMPTY);
        assert_eq!(sorted(index.query(&q)), vec![e(1), e(2), e(3)]);

        let q = QueryMask::new(A.with(B), C);
        assert_eq!(index.query(&q), vec![e(2)]);

        let q = QueryMask::new(Mask::EMPTY, A);
        assert_eq!(index.query(&q), vec![e(4)]);
    }

    #[test]
    fn test_query_returns_snapshot() {
        let mut index = ArchetypeIndex::new();
        index.insert(e(1), A);
        let q = QueryMask::new(A, Mask::EMPTY);
        let snapshot = index.query(&q);

        index.move_entity(e(1), A, B);
        assert_eq!(snapshot, vec![e(1)]);
        assert!(index.query(&q).is_empty());
    }

    #[test]
    fn test_prune_drops_empty_sets() {
        let mut index = ArchetypeIndex::new();
        index.insert(e(1), A);
        index.move_entity(e(1), A, B);
        assert_eq!(index.archetype_count(), 2);
        assert_eq!(index.prune(), 1);
        assert_eq!(index.archetype_count(), 1);
        assert!(index.get(A).is_none());
    }
}
