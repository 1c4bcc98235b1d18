//! Explain trees and plan hashes for join trees and select writers.
//!
//! The tree is deterministic: relations at each level are listed sorted by
//! operator and alias, so hash-map iteration order never reaches the output
//! or the hash.

use crate::query::join_tree::JoinTree;
use crate::query::node::{MultiRowSelectNode, SelectNode};
use crate::query::placement::LayerPolicy;
use crate::query::relation::{ConnectionSlice, Nullable, RelationKey};
use crate::query::source::{ObjectSelectSource, SelectSource};
use crate::query::sql::Column;
use crate::query::writer::SelectWriter;
use serde::Serialize;
use std::hash::Hasher;
use xxhash_rust::xxh64::Xxh64;

/// Human-readable explain tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanExplain {
    /// Root node of the explain tree
    pub root: ExplainNode,
    /// Deterministic hash for the plan.
    pub plan_hash: u64,
}

impl PlanExplain {
    fn from_root(root: ExplainNode) -> Self {
        let mut hasher = Xxh64::new(0);
        hash_explain_node(&root, &mut hasher);
        Self {
            plan_hash: hasher.finish(),
            root,
        }
    }
}

/// Explain node representing an operator with optional metadata.
///
/// Ordering compares the operator name first and then the properties, whose
/// first entry is the relation alias.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ExplainNode {
    /// Operator name
    pub op: String,
    /// Additional properties describing the operator
    pub props: Vec<ExplainProp>,
    /// Input operators
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Creates a new explain node with the given operator name.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Value of the first property named `key`.
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|prop| prop.key == key)
            .map(|prop| prop.value.as_str())
    }
}

/// Single property associated with an [`ExplainNode`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Property value serialized for display.
    pub value: String,
    /// Whether this property contains literal data that may be redacted.
    pub redactable: bool,
}

impl ExplainProp {
    fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            redactable: false,
        }
    }

    fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            redactable: true,
        }
    }
}

/// Explains a join tree on its own.
pub fn explain_join_tree(tree: &JoinTree) -> PlanExplain {
    let mut root = ExplainNode::new("JoinTree");
    root.inputs = join_tree_inputs(tree);
    PlanExplain::from_root(root)
}

impl SelectWriter {
    /// Explains the writer: registered CTEs first, then the join tree.
    pub fn explain(&self) -> PlanExplain {
        let mut root = ExplainNode::new("SelectWriter");
        for (alias, query) in self.ctes.sorted() {
            let mut cte = ExplainNode::new("Cte");
            cte.props.push(ExplainProp::plain("alias", alias.identifier().as_str()));
            cte.props.push(ExplainProp::literal("query", query.to_string()));
            root.inputs.push(cte);
        }
        let mut joins = ExplainNode::new("JoinTree");
        joins.inputs = join_tree_inputs(&self.join_tree);
        root.inputs.push(joins);
        PlanExplain::from_root(root)
    }
}

fn join_tree_inputs(tree: &JoinTree) -> Vec<ExplainNode> {
    let mut inputs = Vec::with_capacity(tree.len());
    for (source, node) in &tree.object_relations {
        let mut explain = relation_node(source);
        explain.props.push(ExplainProp::plain("name", source.name.clone()));
        explain.props.push(ExplainProp::plain("nullable", nullable_name(source.nullable)));
        push_mapping(&mut explain, source.column_mapping.iter());
        push_object_source(&mut explain, &source.source);
        attach_node(&mut explain, node);
        inputs.push(explain);
    }
    for (source, node) in &tree.array_relations {
        let mut explain = relation_node(source);
        push_mapping(&mut explain, source.column_mapping.iter());
        push_source(&mut explain, &source.source);
        attach_multi_row(&mut explain, node);
        inputs.push(explain);
    }
    for (source, node) in &tree.array_connections {
        let mut explain = relation_node(source);
        push_mapping(&mut explain, source.column_mapping.iter());
        if let Some(filter) = &source.split_filter {
            explain.props.push(ExplainProp::literal("split_filter", filter.to_string()));
        }
        if let Some(slice) = source.slice {
            let value = match slice {
                ConnectionSlice::First(n) => format!("first {n}"),
                ConnectionSlice::Last(n) => format!("last {n}"),
            };
            explain.props.push(ExplainProp::plain("slice", value));
        }
        push_source(&mut explain, &source.source);
        attach_multi_row(&mut explain, node);
        inputs.push(explain);
    }
    for (source, node) in &tree.computed_field_table_sets {
        let mut explain = relation_node(source);
        explain.props.push(ExplainProp::plain("field", source.field_name.clone()));
        push_source(&mut explain, &source.source);
        attach_multi_row(&mut explain, node);
        inputs.push(explain);
    }
    inputs.sort();
    inputs
}

fn relation_node<K: RelationKey>(source: &K) -> ExplainNode {
    let mut explain = ExplainNode::new(K::KIND);
    explain
        .props
        .push(ExplainProp::plain("alias", source.join_alias().as_str()));
    explain
}

fn nullable_name(nullable: Nullable) -> &'static str {
    match nullable {
        Nullable::Nullable => "nullable",
        Nullable::NotNullable => "not_nullable",
    }
}

fn push_mapping<'a>(
    explain: &mut ExplainNode,
    mapping: impl Iterator<Item = (&'a Column, &'a Column)>,
) {
    let pairs: Vec<String> = mapping
        .map(|(parent, child)| format!("{} = {}", parent.0, child.0))
        .collect();
    if !pairs.is_empty() {
        explain.props.push(ExplainProp::plain("on", pairs.join(" AND ")));
    }
}

fn push_object_source(explain: &mut ExplainNode, source: &ObjectSelectSource) {
    explain.props.push(ExplainProp::plain("from", source.from.to_string()));
    explain
        .props
        .push(ExplainProp::literal("where", source.where_.to_string()));
}

fn push_source(explain: &mut ExplainNode, source: &SelectSource) {
    explain.props.push(ExplainProp::plain("from", source.from.to_string()));
    explain
        .props
        .push(ExplainProp::literal("where", source.where_.to_string()));
    let placement = source.placement();
    push_layer(explain, "base", &placement.at_base);
    push_layer(explain, "node", &placement.at_node);
}

fn push_layer(explain: &mut ExplainNode, layer: &str, policy: &LayerPolicy) {
    if let Some(distinct) = &policy.distinct {
        explain
            .props
            .push(ExplainProp::plain(format!("{layer}.distinct"), distinct.to_string()));
    }
    if let Some(order_by) = &policy.order_by {
        explain
            .props
            .push(ExplainProp::plain(format!("{layer}.order_by"), order_by.to_string()));
    }
    if let Some(limit) = policy.slicing.limit {
        explain
            .props
            .push(ExplainProp::literal(format!("{layer}.limit"), limit.to_string()));
    }
    if let Some(offset) = policy.slicing.offset {
        explain
            .props
            .push(ExplainProp::literal(format!("{layer}.offset"), offset.to_string()));
    }
}

fn attach_node(explain: &mut ExplainNode, node: &SelectNode) {
    let columns: Vec<&str> = node.extractors.aliases().map(|alias| alias.as_str()).collect();
    explain.props.push(ExplainProp::plain("columns", columns.join(", ")));
    explain.inputs = join_tree_inputs(&node.joins);
}

fn attach_multi_row(explain: &mut ExplainNode, node: &MultiRowSelectNode) {
    if !node.top_extractors.is_empty() {
        let top: Vec<String> = node.top_extractors.iter().map(ToString::to_string).collect();
        explain.props.push(ExplainProp::plain("top", top.join(", ")));
    }
    attach_node(explain, &node.node);
}

fn hash_explain_node(node: &ExplainNode, hasher: &mut Xxh64) {
    hasher.write(node.op.as_bytes());
    hasher.write_u64(node.props.len() as u64);
    for prop in &node.props {
        hasher.write(prop.key.as_bytes());
        hasher.write_u8(0);
        hasher.write(prop.value.as_bytes());
        hasher.write_u8(0);
    }
    hasher.write_u64(node.inputs.len() as u64);
    for child in &node.inputs {
        hash_explain_node(child, hasher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::merge::Merge;
    use crate::query::relation::{column_mapping, ArrayRelationSource, ObjectRelationSource};
    use crate::query::sorting::{
        DistinctAndOrderByExpr, SelectSlicing, SelectSorting, SortingAndSlicing,
    };
    use crate::query::sql::{
        BoolExpr, ColumnAlias, Expr, FromItem, Identifier, InterpolatedQuery, OrderByExpr,
        OrderByItem, TableAlias,
    };

    fn author() -> ObjectRelationSource {
        ObjectRelationSource {
            name: "author".into(),
            column_mapping: column_mapping([("author_id", "id")]),
            source: ObjectSelectSource::new(
                Identifier::new("_root.or.author"),
                FromItem::table("public", "author"),
                BoolExpr::always_true(),
            ),
            nullable: Nullable::Nullable,
        }
    }

    fn posts() -> ArrayRelationSource {
        let created_at = Expr::qualified("_root.ar.posts", "created_at");
        let order = OrderByExpr::new(OrderByItem::desc(created_at));
        ArrayRelationSource {
            alias: TableAlias::new("_root.ar.posts"),
            column_mapping: column_mapping([("id", "author_id")]),
            source: SelectSource::new(
                Identifier::new("_root.ar.posts"),
                FromItem::table("public", "post"),
                BoolExpr::always_true(),
                SortingAndSlicing::new(
                    SelectSorting::Sorting(DistinctAndOrderByExpr::at_node(order, None)),
                    SelectSlicing {
                        limit: Some(10),
                        offset: None,
                    },
                ),
            ),
        }
    }

    fn tree() -> JoinTree {
        JoinTree::object_relation(
            author(),
            SelectNode::with_extractors([(ColumnAlias::new("name"), Expr::column("name"))]),
        )
        .merge(JoinTree::array_relation(posts(), MultiRowSelectNode::default()))
    }

    #[test]
    fn children_are_sorted_by_operator() {
        let explain = explain_join_tree(&tree());
        let ops: Vec<&str> = explain.root.inputs.iter().map(|node| node.op.as_str()).collect();
        assert_eq!(ops, ["ArrayRelation", "ObjectRelation"]);
    }

    #[test]
    fn node_layer_slicing_is_reported() {
        let explain = explain_join_tree(&tree());
        let posts = &explain.root.inputs[0];
        assert_eq!(posts.prop("node.limit"), Some("10"));
        assert_eq!(posts.prop("base.limit"), None);
    }

    #[test]
    fn plan_hash_ignores_merge_order() {
        let left = explain_join_tree(&tree());
        let swapped = JoinTree::array_relation(posts(), MultiRowSelectNode::default()).merge(
            JoinTree::object_relation(
                author(),
                SelectNode::with_extractors([(ColumnAlias::new("name"), Expr::column("name"))]),
            ),
        );
        assert_eq!(left.plan_hash, explain_join_tree(&swapped).plan_hash);
    }

    #[test]
    fn plan_hash_changes_with_content() {
        let base = explain_join_tree(&tree()).plan_hash;
        let author_only = JoinTree::object_relation(author(), SelectNode::empty());
        let other = explain_join_tree(&author_only).plan_hash;
        assert_ne!(base, other);
    }

    #[test]
    fn writer_explain_lists_ctes_before_joins() {
        let mut writer = SelectWriter::from_join_tree(tree());
        writer.tell_cte(TableAlias::new("cte_recent_0"), InterpolatedQuery::text("SELECT 1"));
        let explain = writer.explain();
        assert_eq!(explain.root.op, "SelectWriter");
        assert_eq!(explain.root.inputs[0].op, "Cte");
        assert_eq!(explain.root.inputs[0].prop("alias"), Some("cte_recent_0"));
        assert_eq!(explain.root.inputs[1].op, "JoinTree");
    }
}
