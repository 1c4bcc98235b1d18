#![allow(dead_code)]

use proptest::prelude::*;
use relplan::query::relation::column_mapping;
use relplan::query::sql::{
    BoolExpr, ColumnAlias, DistinctExpr, Expr, FromItem, FunctionName, Identifier,
    InterpolatedQuery, OrderByExpr, OrderByItem, TableAlias,
};
use relplan::query::{
    ArrayConnectionSource, ArrayRelationSource, ComputedFieldTableSetSource, ConnectionSlice,
    CustomSqlCtes, DistinctAndOrderByExpr, JoinTree, MultiRowSelectNode, Nullable,
    ObjectRelationSource, ObjectSelectSource, SelectNode, SelectSlicing, SelectSorting,
    SelectSource, SelectWriter, SortingAndSlicing,
};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("relplan=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

pub fn order_on(column: &str) -> OrderByExpr {
    OrderByExpr::new(OrderByItem::asc(Expr::column(column)))
}

pub fn distinct_on(column: &str) -> DistinctExpr {
    DistinctExpr::DistinctOn(vec![Expr::column(column)])
}

pub fn slicing(limit: Option<u64>, offset: Option<u64>) -> SelectSlicing {
    SelectSlicing { limit, offset }
}

pub fn table_source(prefix: &str, table: &str, policy: SortingAndSlicing) -> SelectSource {
    SelectSource::new(
        Identifier::new(prefix),
        FromItem::table("public", table),
        BoolExpr::always_true(),
        policy,
    )
}

pub fn author_relation(nullable: Nullable) -> ObjectRelationSource {
    ObjectRelationSource {
        name: "author".into(),
        column_mapping: column_mapping([("author_id", "id")]),
        source: ObjectSelectSource::new(
            Identifier::new("_root.or.author"),
            FromItem::table("public", "author"),
            BoolExpr::always_true(),
        ),
        nullable,
    }
}

pub fn posts_relation(limit: Option<u64>) -> ArrayRelationSource {
    ArrayRelationSource {
        alias: TableAlias::new("_root.ar.posts"),
        column_mapping: column_mapping([("id", "author_id")]),
        source: table_source(
            "_root.ar.posts",
            "post",
            SortingAndSlicing::new(SelectSorting::NoSorting(None), slicing(limit, None)),
        ),
    }
}

pub fn comments_connection(slice: Option<ConnectionSlice>) -> ArrayConnectionSource {
    let sorting = SelectSorting::Sorting(DistinctAndOrderByExpr::at_node(order_on("id"), None));
    ArrayConnectionSource {
        alias: TableAlias::new("_root.ac.comments"),
        column_mapping: column_mapping([("id", "post_id")]),
        split_filter: None,
        slice,
        source: table_source(
            "_root.ac.comments",
            "comment",
            SortingAndSlicing::new(sorting, SelectSlicing::none()),
        ),
    }
}

pub fn search_table_set() -> ComputedFieldTableSetSource {
    ComputedFieldTableSetSource {
        field_name: "search_posts".into(),
        source: SelectSource::new(
            Identifier::new("_root.cf.search_posts"),
            FromItem::Function {
                name: FunctionName::qualified("public", "search_posts"),
                args: vec![Expr::qualified("_root", "id")],
                alias: TableAlias::new("_root.cf.search_posts"),
            },
            BoolExpr::always_true(),
            SortingAndSlicing::default(),
        ),
    }
}

pub fn arb_expr() -> impl Strategy<Value = Expr> {
    prop_oneof![
        prop::sample::select(vec!["id", "name", "title", "created_at"])
            .prop_map(|name| Expr::column(name)),
        (0i64..4).prop_map(|value| Expr::literal(value)),
    ]
}

pub fn arb_binding() -> impl Strategy<Value = (ColumnAlias, Expr)> {
    (
        prop::sample::select(vec!["id", "name", "title", "posts", "author"]),
        arb_expr(),
    )
        .prop_map(|(alias, expr)| (ColumnAlias::new(alias), expr))
}

pub fn arb_select_node(depth: u32) -> BoxedStrategy<SelectNode> {
    let bindings = prop::collection::vec(arb_binding(), 0..4);
    (bindings, arb_join_tree(depth))
        .prop_map(|(bindings, joins)| {
            let mut node = SelectNode::with_extractors(bindings);
            node.joins = joins;
            node
        })
        .boxed()
}

pub fn arb_multi_row_node(depth: u32) -> BoxedStrategy<MultiRowSelectNode> {
    let top = prop::collection::vec(arb_expr(), 0..2);
    (top, arb_select_node(depth))
        .prop_map(|(top, node)| MultiRowSelectNode::new(top, node))
        .boxed()
}

#[derive(Clone, Debug)]
pub enum Entry {
    Object(ObjectRelationSource, SelectNode),
    Array(ArrayRelationSource, MultiRowSelectNode),
    Connection(ArrayConnectionSource, MultiRowSelectNode),
    TableSet(ComputedFieldTableSetSource, MultiRowSelectNode),
}

impl Entry {
    pub fn into_tree(self) -> JoinTree {
        match self {
            Entry::Object(source, node) => JoinTree::object_relation(source, node),
            Entry::Array(source, node) => JoinTree::array_relation(source, node),
            Entry::Connection(source, node) => JoinTree::array_connection(source, node),
            Entry::TableSet(source, node) => JoinTree::computed_field_table_set(source, node),
        }
    }
}

/// Descriptors are drawn from a small pool so that generated trees share keys
/// often enough to exercise the merge-on-collision path.
pub fn arb_entry(depth: u32) -> BoxedStrategy<Entry> {
    prop_oneof![
        (any::<bool>(), arb_select_node(depth)).prop_map(|(nullable, node)| {
            let nullable = if nullable {
                Nullable::Nullable
            } else {
                Nullable::NotNullable
            };
            Entry::Object(author_relation(nullable), node)
        }),
        (prop::option::of(1u64..3), arb_multi_row_node(depth))
            .prop_map(|(limit, node)| Entry::Array(posts_relation(limit), node)),
        (prop::option::of(1u64..3), arb_multi_row_node(depth)).prop_map(|(first, node)| {
            Entry::Connection(comments_connection(first.map(ConnectionSlice::First)), node)
        }),
        arb_multi_row_node(depth).prop_map(|node| Entry::TableSet(search_table_set(), node)),
    ]
    .boxed()
}

pub fn arb_join_tree(depth: u32) -> BoxedStrategy<JoinTree> {
    if depth == 0 {
        return Just(JoinTree::default()).boxed();
    }
    prop::collection::vec(arb_entry(depth - 1), 0..3)
        .prop_map(|entries| {
            let mut tree = JoinTree::default();
            for entry in entries {
                match entry {
                    Entry::Object(source, node) => tree.insert_object_relation(source, node),
                    Entry::Array(source, node) => tree.insert_array_relation(source, node),
                    Entry::Connection(source, node) => tree.insert_array_connection(source, node),
                    Entry::TableSet(source, node) => {
                        tree.insert_computed_field_table_set(source, node)
                    }
                }
            }
            tree
        })
        .boxed()
}

pub fn arb_ctes() -> impl Strategy<Value = CustomSqlCtes> {
    prop::collection::vec((0u8..3, 0u8..3), 0..3).prop_map(|entries| {
        let mut writer = SelectWriter::default();
        for (alias, body) in entries {
            writer.tell_cte(
                TableAlias::new(format!("cte_q_{alias}")),
                InterpolatedQuery::text(format!("SELECT {body}")),
            );
        }
        writer.ctes
    })
}

pub fn arb_writer() -> impl Strategy<Value = SelectWriter> {
    (arb_join_tree(2), arb_ctes()).prop_map(|(join_tree, ctes)| SelectWriter { join_tree, ctes })
}

pub fn arb_sorting() -> impl Strategy<Value = SelectSorting> {
    let distinct = prop::option::of(prop::sample::select(vec!["x", "y"]).prop_map(distinct_on));
    let order = prop::sample::select(vec!["x", "y", "z"]).prop_map(order_on);
    prop_oneof![
        distinct.clone().prop_map(SelectSorting::NoSorting),
        (
            order.clone(),
            distinct.clone(),
            prop::option::of((order, distinct))
        )
            .prop_map(|(node_order, node_distinct, base)| {
                SelectSorting::Sorting(DistinctAndOrderByExpr {
                    at_node: (node_order, node_distinct),
                    at_base: base,
                })
            }),
    ]
}

pub fn arb_slicing() -> impl Strategy<Value = SelectSlicing> {
    (prop::option::of(1u64..100), prop::option::of(0u64..100))
        .prop_map(|(limit, offset)| slicing(limit, offset))
}

pub fn arb_policy() -> impl Strategy<Value = SortingAndSlicing> {
    (arb_sorting(), arb_slicing())
        .prop_map(|(sorting, slicing)| SortingAndSlicing::new(sorting, slicing))
}
