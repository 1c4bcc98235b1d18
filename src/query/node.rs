//! Payloads attached to relations in a join tree.

use crate::query::join_tree::JoinTree;
use crate::query::merge::{Merge, TryMerge};
use crate::query::sql::{ColumnAlias, Expr};
use crate::types::{PlanError, Result};
use tracing::warn;

/// Output columns of a select, in the order the caller observes them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extractors(Vec<(ColumnAlias, Expr)>);

impl Extractors {
    /// Creates an empty extractor list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Expression bound to `alias`, if any.
    pub fn get(&self, alias: &ColumnAlias) -> Option<&Expr> {
        self.0
            .iter()
            .find_map(|(bound, expr)| (bound == alias).then_some(expr))
    }

    /// Returns true when `alias` is bound.
    pub fn contains(&self, alias: &ColumnAlias) -> bool {
        self.get(alias).is_some()
    }

    /// Binds `alias` unless it is already bound; the first binding wins.
    ///
    /// Returns false when the alias was already bound.
    pub fn insert(&mut self, alias: ColumnAlias, expr: Expr) -> bool {
        match self.get(&alias) {
            Some(existing) => {
                if *existing != expr {
                    warn!(alias = alias.as_str(), "extractors.conflict_dropped");
                }
                false
            }
            None => {
                self.0.push((alias, expr));
                true
            }
        }
    }

    /// Binds `alias`, failing when it is already bound to a different
    /// expression. Re-binding the same expression is a no-op.
    pub fn try_insert(&mut self, alias: ColumnAlias, expr: Expr) -> Result<()> {
        match self.get(&alias) {
            Some(existing) if *existing == expr => Ok(()),
            Some(_) => Err(PlanError::ConflictingExtractor {
                alias: alias.as_str().to_owned(),
            }),
            None => {
                self.0.push((alias, expr));
                Ok(())
            }
        }
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnAlias, &Expr)> {
        self.0.iter().map(|(alias, expr)| (alias, expr))
    }

    /// Iterates aliases in insertion order.
    pub fn aliases(&self) -> impl Iterator<Item = &ColumnAlias> {
        self.0.iter().map(|(alias, _)| alias)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ColumnAlias, Expr)> for Extractors {
    fn from_iter<T: IntoIterator<Item = (ColumnAlias, Expr)>>(iter: T) -> Self {
        let mut extractors = Extractors::new();
        for (alias, expr) in iter {
            extractors.insert(alias, expr);
        }
        extractors
    }
}

impl IntoIterator for Extractors {
    type Item = (ColumnAlias, Expr);
    type IntoIter = std::vec::IntoIter<(ColumnAlias, Expr)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Merge for Extractors {
    fn empty() -> Self {
        Extractors::new()
    }

    fn merge(mut self, other: Self) -> Self {
        for (alias, expr) in other {
            self.insert(alias, expr);
        }
        self
    }
}

impl TryMerge for Extractors {
    fn try_merge(mut self, other: Self) -> Result<Self> {
        for (alias, expr) in other {
            self.try_insert(alias, expr)?;
        }
        Ok(self)
    }
}

/// Output expressions plus the relations nested beneath them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectNode {
    /// Named output expressions.
    pub extractors: Extractors,
    /// Nested relations.
    pub joins: JoinTree,
}

impl SelectNode {
    /// Creates a node from its parts.
    pub fn new(extractors: Extractors, joins: JoinTree) -> Self {
        Self { extractors, joins }
    }

    /// Node with output columns and no nested relations.
    pub fn with_extractors(extractors: impl IntoIterator<Item = (ColumnAlias, Expr)>) -> Self {
        Self {
            extractors: extractors.into_iter().collect(),
            joins: JoinTree::default(),
        }
    }
}

impl Merge for SelectNode {
    fn empty() -> Self {
        SelectNode::default()
    }

    fn merge(self, other: Self) -> Self {
        SelectNode {
            extractors: self.extractors.merge(other.extractors),
            joins: self.joins.merge(other.joins),
        }
    }
}

impl TryMerge for SelectNode {
    fn try_merge(self, other: Self) -> Result<Self> {
        Ok(SelectNode {
            extractors: self.extractors.try_merge(other.extractors)?,
            joins: self.joins.try_merge(other.joins)?,
        })
    }
}

/// Node for relations that yield many rows; the aggregation layer may add
/// top-level expressions (e.g. the JSON aggregate wrapper) of its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiRowSelectNode {
    /// Expressions evaluated at the aggregation layer.
    pub top_extractors: Vec<Expr>,
    /// Per-row node.
    pub node: SelectNode,
}

impl MultiRowSelectNode {
    /// Creates a multi-row node from its parts.
    pub fn new(top_extractors: Vec<Expr>, node: SelectNode) -> Self {
        Self {
            top_extractors,
            node,
        }
    }
}

impl Merge for MultiRowSelectNode {
    fn empty() -> Self {
        MultiRowSelectNode::default()
    }

    fn merge(mut self, other: Self) -> Self {
        self.top_extractors.extend(other.top_extractors);
        MultiRowSelectNode {
            top_extractors: self.top_extractors,
            node: self.node.merge(other.node),
        }
    }
}

impl TryMerge for MultiRowSelectNode {
    fn try_merge(mut self, other: Self) -> Result<Self> {
        self.top_extractors.extend(other.top_extractors);
        Ok(MultiRowSelectNode {
            top_extractors: self.top_extractors,
            node: self.node.try_merge(other.node)?,
        })
    }
}
