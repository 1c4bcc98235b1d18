//! The join tree: every nested relation of a select, keyed by its descriptor.
//!
//! Merging two trees unions the four relation maps. When both sides carry
//! the same descriptor the two nodes are merged rather than one replacing the
//! other, which is how independently built sub-plans for one relation
//! occurrence end up sharing a single join.

use crate::query::merge::{Merge, TryMerge};
use crate::query::node::{MultiRowSelectNode, SelectNode};
use crate::query::relation::{
    ArrayConnectionSource, ArrayRelationSource, ComputedFieldTableSetSource, ObjectRelationSource,
    RelationKey,
};
use crate::query::sql::Identifier;
use crate::types::{PlanError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;
use std::mem;
use tracing::debug;

/// Nested relations of one select level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinTree {
    /// To-one relations.
    pub object_relations: FxHashMap<ObjectRelationSource, SelectNode>,
    /// Plain to-many relations.
    pub array_relations: FxHashMap<ArrayRelationSource, MultiRowSelectNode>,
    /// Paginated to-many relations.
    pub array_connections: FxHashMap<ArrayConnectionSource, MultiRowSelectNode>,
    /// Function-backed to-many relations.
    pub computed_field_table_sets: FxHashMap<ComputedFieldTableSetSource, MultiRowSelectNode>,
}

impl JoinTree {
    /// Tree holding a single to-one relation.
    pub fn object_relation(source: ObjectRelationSource, node: SelectNode) -> Self {
        let mut tree = JoinTree::default();
        tree.insert_object_relation(source, node);
        tree
    }

    /// Tree holding a single to-many relation.
    pub fn array_relation(source: ArrayRelationSource, node: MultiRowSelectNode) -> Self {
        let mut tree = JoinTree::default();
        tree.insert_array_relation(source, node);
        tree
    }

    /// Tree holding a single connection.
    pub fn array_connection(source: ArrayConnectionSource, node: MultiRowSelectNode) -> Self {
        let mut tree = JoinTree::default();
        tree.insert_array_connection(source, node);
        tree
    }

    /// Tree holding a single computed-field table set.
    pub fn computed_field_table_set(
        source: ComputedFieldTableSetSource,
        node: MultiRowSelectNode,
    ) -> Self {
        let mut tree = JoinTree::default();
        tree.insert_computed_field_table_set(source, node);
        tree
    }

    /// Adds a to-one relation, merging with an existing identical one.
    pub fn insert_object_relation(&mut self, source: ObjectRelationSource, node: SelectNode) {
        insert_merging(&mut self.object_relations, source, node);
    }

    /// Adds a to-many relation, merging with an existing identical one.
    pub fn insert_array_relation(&mut self, source: ArrayRelationSource, node: MultiRowSelectNode) {
        insert_merging(&mut self.array_relations, source, node);
    }

    /// Adds a connection, merging with an existing identical one.
    pub fn insert_array_connection(
        &mut self,
        source: ArrayConnectionSource,
        node: MultiRowSelectNode,
    ) {
        insert_merging(&mut self.array_connections, source, node);
    }

    /// Adds a computed-field table set, merging with an existing identical one.
    pub fn insert_computed_field_table_set(
        &mut self,
        source: ComputedFieldTableSetSource,
        node: MultiRowSelectNode,
    ) {
        insert_merging(&mut self.computed_field_table_sets, source, node);
    }

    /// Number of relations at this level.
    pub fn len(&self) -> usize {
        self.object_relations.len()
            + self.array_relations.len()
            + self.array_connections.len()
            + self.computed_field_table_sets.len()
    }

    /// Returns true when there are no relations at this level.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of relations at this level and every level below it.
    pub fn total_relations(&self) -> usize {
        let nested: usize = self
            .object_relations
            .values()
            .map(|node| node.joins.total_relations())
            .chain(
                self.array_relations
                    .values()
                    .chain(self.array_connections.values())
                    .chain(self.computed_field_table_sets.values())
                    .map(|multi| multi.node.joins.total_relations()),
            )
            .sum();
        self.len() + nested
    }

    /// Join aliases bound at this level, in no particular order.
    pub fn join_aliases(&self) -> impl Iterator<Item = &Identifier> {
        self.object_relations
            .keys()
            .map(RelationKey::join_alias)
            .chain(self.array_relations.keys().map(RelationKey::join_alias))
            .chain(self.array_connections.keys().map(RelationKey::join_alias))
            .chain(self.computed_field_table_sets.keys().map(RelationKey::join_alias))
    }

    /// Checks that no two different relations at any level bind the same
    /// join alias.
    ///
    /// Identical descriptors always merge, so a repeated alias means two
    /// descriptors differ in some field (nullability, filter, ordering) yet
    /// would be rendered under one name.
    pub fn validate_aliases(&self) -> Result<()> {
        self.check_level_aliases()?;
        for node in self.object_relations.values() {
            node.joins.validate_aliases()?;
        }
        for multi in self
            .array_relations
            .values()
            .chain(self.array_connections.values())
            .chain(self.computed_field_table_sets.values())
        {
            multi.node.joins.validate_aliases()?;
        }
        Ok(())
    }

    fn check_level_aliases(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for alias in self.join_aliases() {
            if !seen.insert(alias) {
                return Err(PlanError::AliasCollision {
                    alias: alias.as_str().to_owned(),
                });
            }
        }
        Ok(())
    }
}

fn insert_merging<K, V>(map: &mut FxHashMap<K, V>, key: K, value: V)
where
    K: RelationKey,
    V: Merge,
{
    match map.entry(key) {
        Entry::Occupied(mut slot) => {
            debug!(
                kind = K::KIND,
                alias = slot.key().join_alias().as_str(),
                "join_tree.shared_join"
            );
            let existing = mem::replace(slot.get_mut(), V::empty());
            *slot.get_mut() = existing.merge(value);
        }
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
    }
}

fn try_insert_merging<K, V>(map: &mut FxHashMap<K, V>, key: K, value: V) -> Result<()>
where
    K: RelationKey,
    V: TryMerge,
{
    match map.entry(key) {
        Entry::Occupied(mut slot) => {
            debug!(
                kind = K::KIND,
                alias = slot.key().join_alias().as_str(),
                "join_tree.shared_join"
            );
            let existing = mem::replace(slot.get_mut(), V::empty());
            *slot.get_mut() = existing.try_merge(value)?;
        }
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
    }
    Ok(())
}

fn union_with<K, V>(mut left: FxHashMap<K, V>, right: FxHashMap<K, V>) -> FxHashMap<K, V>
where
    K: RelationKey,
    V: Merge,
{
    for (key, value) in right {
        insert_merging(&mut left, key, value);
    }
    left
}

fn try_union_with<K, V>(
    mut left: FxHashMap<K, V>,
    right: FxHashMap<K, V>,
) -> Result<FxHashMap<K, V>>
where
    K: RelationKey,
    V: TryMerge,
{
    for (key, value) in right {
        try_insert_merging(&mut left, key, value)?;
    }
    Ok(left)
}

impl Merge for JoinTree {
    fn empty() -> Self {
        JoinTree::default()
    }

    fn merge(self, other: Self) -> Self {
        JoinTree {
            object_relations: union_with(self.object_relations, other.object_relations),
            array_relations: union_with(self.array_relations, other.array_relations),
            array_connections: union_with(self.array_connections, other.array_connections),
            computed_field_table_sets: union_with(
                self.computed_field_table_sets,
                other.computed_field_table_sets,
            ),
        }
    }
}

impl TryMerge for JoinTree {
    /// Merges like [`Merge::merge`] but rejects conflicting extractors in
    /// shared nodes and alias collisions between different relations.
    fn try_merge(self, other: Self) -> Result<Self> {
        let merged = JoinTree {
            object_relations: try_union_with(self.object_relations, other.object_relations)?,
            array_relations: try_union_with(self.array_relations, other.array_relations)?,
            array_connections: try_union_with(self.array_connections, other.array_connections)?,
            computed_field_table_sets: try_union_with(
                self.computed_field_table_sets,
                other.computed_field_table_sets,
            )?,
        };
        merged.check_level_aliases()?;
        Ok(merged)
    }
}
