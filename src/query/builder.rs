//! Fluent construction of select nodes.

use crate::query::config::PlannerConfig;
use crate::query::join_tree::JoinTree;
use crate::query::merge::{Merge, TryMerge};
use crate::query::node::{MultiRowSelectNode, SelectNode};
use crate::query::relation::{
    ArrayConnectionSource, ArrayRelationSource, ComputedFieldTableSetSource, ObjectRelationSource,
};
use crate::query::sql::{ColumnAlias, Expr};
use crate::types::{PlanError, Result};
use std::mem;

/// Builds a [`SelectNode`] one output column or relation at a time.
///
/// The first failure is kept and every later call becomes a no-op; it is
/// reported from [`SelectNodeBuilder::build`].
#[derive(Debug, Default)]
pub struct SelectNodeBuilder {
    node: SelectNode,
    strict: bool,
    error: Option<PlanError>,
}

impl SelectNodeBuilder {
    /// Lenient builder: conflicting bindings keep the first one seen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose strictness follows `config.strict_merge`.
    pub fn with_config(config: &PlannerConfig) -> Self {
        Self {
            strict: config.strict_merge,
            ..Self::default()
        }
    }

    /// Binds an output column.
    pub fn extract(mut self, alias: impl Into<ColumnAlias>, expr: Expr) -> Self {
        if self.error.is_some() {
            return self;
        }
        let alias = alias.into();
        if alias.as_str().is_empty() {
            self.error = Some(PlanError::EmptyIdentifier {
                context: "extractor alias",
            });
            return self;
        }
        if self.strict {
            if let Err(err) = self.node.extractors.try_insert(alias, expr) {
                self.error = Some(err);
            }
        } else {
            self.node.extractors.insert(alias, expr);
        }
        self
    }

    /// Nests a to-one relation.
    pub fn object_relation(self, source: ObjectRelationSource, node: SelectNode) -> Self {
        self.join(JoinTree::object_relation(source, node))
    }

    /// Nests a plain to-many relation.
    pub fn array_relation(self, source: ArrayRelationSource, node: MultiRowSelectNode) -> Self {
        self.join(JoinTree::array_relation(source, node))
    }

    /// Nests a paginated to-many relation.
    pub fn array_connection(self, source: ArrayConnectionSource, node: MultiRowSelectNode) -> Self {
        self.join(JoinTree::array_connection(source, node))
    }

    /// Nests a function-backed to-many relation.
    pub fn computed_field_table_set(
        self,
        source: ComputedFieldTableSetSource,
        node: MultiRowSelectNode,
    ) -> Self {
        self.join(JoinTree::computed_field_table_set(source, node))
    }

    /// Merges a whole join tree into the node being built.
    pub fn join(mut self, tree: JoinTree) -> Self {
        if self.error.is_some() {
            return self;
        }
        let joins = mem::take(&mut self.node.joins);
        if self.strict {
            match joins.try_merge(tree) {
                Ok(merged) => self.node.joins = merged,
                Err(err) => self.error = Some(err),
            }
        } else {
            self.node.joins = joins.merge(tree);
        }
        self
    }

    /// Finishes the node, reporting the first recorded failure.
    pub fn build(self) -> Result<SelectNode> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.strict {
            self.node.joins.validate_aliases()?;
        }
        Ok(self.node)
    }

    /// Finishes the node as the per-row half of a multi-row relation.
    pub fn build_multi_row(self, top_extractors: Vec<Expr>) -> Result<MultiRowSelectNode> {
        Ok(MultiRowSelectNode::new(top_extractors, self.build()?))
    }
}
