//! Select writer: the join tree plus the native queries it inlines as CTEs.

use crate::query::join_tree::JoinTree;
use crate::query::merge::{Merge, TryMerge};
use crate::query::prefix::PrefixAllocator;
use crate::query::sql::{InterpolatedQuery, TableAlias};
use crate::types::{PlanError, Result};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use tracing::trace;

/// Prefix of every alias minted for a native query.
pub const NATIVE_QUERY_ALIAS_PREFIX: &str = "cte_";

/// Externally authored sub-queries, keyed by the alias they are inlined under.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomSqlCtes(FxHashMap<TableAlias, InterpolatedQuery>);

impl CustomSqlCtes {
    /// Registry holding a single CTE.
    pub fn single(alias: TableAlias, query: InterpolatedQuery) -> Self {
        let mut ctes = CustomSqlCtes::default();
        ctes.0.insert(alias, query);
        ctes
    }

    /// Query registered under `alias`.
    pub fn get(&self, alias: &TableAlias) -> Option<&InterpolatedQuery> {
        self.0.get(alias)
    }

    /// Registered CTEs sorted by alias, the order the renderer emits them in.
    pub fn sorted(&self) -> Vec<(&TableAlias, &InterpolatedQuery)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Number of registered CTEs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Merge for CustomSqlCtes {
    fn empty() -> Self {
        CustomSqlCtes::default()
    }

    fn merge(mut self, other: Self) -> Self {
        for (alias, query) in other.0 {
            self.0.entry(alias).or_insert(query);
        }
        self
    }
}

impl TryMerge for CustomSqlCtes {
    fn try_merge(mut self, other: Self) -> Result<Self> {
        for (alias, query) in other.0 {
            match self.0.entry(alias) {
                Entry::Occupied(slot) if *slot.get() == query => {}
                Entry::Occupied(slot) => {
                    return Err(PlanError::DuplicateCte {
                        alias: slot.key().identifier().as_str().to_owned(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(query);
                }
            }
        }
        Ok(self)
    }
}

/// Accumulated output of translating one query: its join tree and the CTEs
/// the tree refers to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectWriter {
    /// Nested relations.
    pub join_tree: JoinTree,
    /// Native queries inlined as CTEs.
    pub ctes: CustomSqlCtes,
}

impl SelectWriter {
    /// Writer holding only a join tree.
    pub fn from_join_tree(join_tree: JoinTree) -> Self {
        Self {
            join_tree,
            ctes: CustomSqlCtes::default(),
        }
    }

    /// Merges `join_tree` into the accumulated tree.
    pub fn tell_join_tree(&mut self, join_tree: JoinTree) {
        let current = std::mem::take(&mut self.join_tree);
        self.join_tree = current.merge(join_tree);
    }

    /// Registers a CTE. An alias already present keeps its first query.
    pub fn tell_cte(&mut self, alias: TableAlias, query: InterpolatedQuery) {
        let current = std::mem::take(&mut self.ctes);
        self.ctes = current.merge(CustomSqlCtes::single(alias, query));
    }

    /// Mints a fresh alias for a native query and registers it as a CTE.
    pub fn register_native_query(
        &mut self,
        store: &mut NativeQueryFreshIdStore,
        name: &str,
        query: InterpolatedQuery,
    ) -> Result<TableAlias> {
        let alias = store.mint_alias(name)?;
        self.tell_cte(alias.clone(), query);
        Ok(alias)
    }
}

impl Merge for SelectWriter {
    fn empty() -> Self {
        SelectWriter::default()
    }

    fn merge(self, other: Self) -> Self {
        SelectWriter {
            join_tree: self.join_tree.merge(other.join_tree),
            ctes: self.ctes.merge(other.ctes),
        }
    }
}

impl TryMerge for SelectWriter {
    fn try_merge(self, other: Self) -> Result<Self> {
        Ok(SelectWriter {
            join_tree: self.join_tree.try_merge(other.join_tree)?,
            ctes: self.ctes.try_merge(other.ctes)?,
        })
    }
}

/// Monotonic counter behind native query aliases.
///
/// Exactly one store exists per plan-building pass. It is threaded through
/// the pass and never merged; parallel sub-plans take disjoint blocks via
/// [`NativeQueryFreshIdStore::reserve`].
#[derive(Clone, Debug)]
pub struct NativeQueryFreshIdStore {
    next_id: u64,
    prefix: String,
    allocator: PrefixAllocator,
}

impl Default for NativeQueryFreshIdStore {
    fn default() -> Self {
        Self {
            next_id: 0,
            prefix: NATIVE_QUERY_ALIAS_PREFIX.to_owned(),
            allocator: PrefixAllocator::default(),
        }
    }
}

impl NativeQueryFreshIdStore {
    /// Store starting at id 0 with the default alias prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a custom alias prefix and identifier length limit.
    pub fn with_settings(prefix: impl Into<String>, allocator: PrefixAllocator) -> Self {
        Self {
            next_id: 0,
            prefix: prefix.into(),
            allocator,
        }
    }

    /// Id the next call to [`Self::next_fresh_id`] will return.
    pub fn peek(&self) -> u64 {
        self.next_id
    }

    /// Returns a fresh id and advances the counter.
    pub fn next_fresh_id(&mut self) -> Result<u64> {
        let id = self.next_id;
        self.advance(1)?;
        Ok(id)
    }

    /// Mints `<prefix><name>_<id>` for a native query.
    pub fn mint_alias(&mut self, name: &str) -> Result<TableAlias> {
        let id = self.next_fresh_id()?;
        trace!(native_query = name, id, "fresh_id.mint_alias");
        Ok(native_query_alias(&self.allocator, &self.prefix, name, id))
    }

    /// Carves `count` ids off the store for independent use.
    pub fn reserve(&mut self, count: u64) -> Result<FreshIdBlock> {
        let start = self.next_id;
        self.advance(count)?;
        Ok(FreshIdBlock {
            next: start,
            start,
            end: self.next_id,
            prefix: self.prefix.clone(),
            allocator: self.allocator,
        })
    }

    // Leaves the counter untouched on overflow so no id is ever handed out twice.
    fn advance(&mut self, count: u64) -> Result<()> {
        self.next_id = self
            .next_id
            .checked_add(count)
            .ok_or(PlanError::FreshIdSpaceExhausted {
                next: self.next_id,
                requested: count,
            })?;
        Ok(())
    }
}

/// Disjoint range of fresh ids handed to a sub-plan built in isolation.
#[derive(Clone, Debug)]
pub struct FreshIdBlock {
    next: u64,
    start: u64,
    end: u64,
    prefix: String,
    allocator: PrefixAllocator,
}

impl FreshIdBlock {
    /// Ids left in the block.
    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }

    /// Returns a fresh id from the block.
    pub fn next_fresh_id(&mut self) -> Result<u64> {
        if self.next == self.end {
            return Err(PlanError::FreshIdBlockExhausted {
                start: self.start,
                end: self.end,
            });
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// Mints a native query alias from the block.
    pub fn mint_alias(&mut self, name: &str) -> Result<TableAlias> {
        let id = self.next_fresh_id()?;
        trace!(native_query = name, id, "fresh_id.mint_alias");
        Ok(native_query_alias(&self.allocator, &self.prefix, name, id))
    }
}

fn native_query_alias(
    allocator: &PrefixAllocator,
    prefix: &str,
    name: &str,
    id: u64,
) -> TableAlias {
    TableAlias(allocator.fit(format!("{prefix}{name}_{id}")))
}
