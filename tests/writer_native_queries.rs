mod common;

use common::{author_relation, init_tracing, posts_relation};
use relplan::query::sql::{
    ColumnAlias, Expr, InterpolatedItem, InterpolatedQuery, Literal, TableAlias,
};
use relplan::query::{
    ConfigError, JoinTree, Merge, MultiRowSelectNode, NativeQueryFreshIdStore, Nullable,
    PlannerConfig, SelectNode, SelectNodeBuilder, SelectWriter, TryMerge,
};
use relplan::PlanError;
use std::collections::HashSet;
use std::io::Write;

fn recent_posts_query(days: i64) -> InterpolatedQuery {
    InterpolatedQuery(vec![
        InterpolatedItem::Text(
            "SELECT * FROM post WHERE created_at > now() - interval '1 day' * ".into(),
        ),
        InterpolatedItem::Scalar(Literal::Int(days)),
    ])
}

#[test]
fn one_store_threads_through_independent_sub_plans() {
    init_tracing();
    let mut store = NativeQueryFreshIdStore::new();
    let mut left = SelectWriter::default();
    let mut right = SelectWriter::default();
    let first = left
        .register_native_query(&mut store, "recent_posts", recent_posts_query(7))
        .expect("id space");
    let second = right
        .register_native_query(&mut store, "recent_posts", recent_posts_query(30))
        .expect("id space");
    assert_ne!(first, second);

    let merged = left.try_merge(right).expect("distinct aliases never collide");
    assert_eq!(merged.ctes.len(), 2);
    assert_eq!(merged.ctes.get(&first), Some(&recent_posts_query(7)));
    assert_eq!(merged.ctes.get(&second), Some(&recent_posts_query(30)));
}

#[test]
fn reserved_blocks_never_overlap() {
    let mut store = NativeQueryFreshIdStore::new();
    let mut blocks = vec![
        store.reserve(3).expect("id space"),
        store.reserve(2).expect("id space"),
    ];
    let mut seen = HashSet::new();
    for block in &mut blocks {
        while block.remaining() > 0 {
            let alias = block.mint_alias("q").expect("block has room");
            assert!(seen.insert(alias));
        }
    }
    assert!(seen.insert(store.mint_alias("q").expect("id space")));
    assert_eq!(seen.len(), 6);
    assert_eq!(
        blocks[1].next_fresh_id(),
        Err(PlanError::FreshIdBlockExhausted { start: 3, end: 5 })
    );
}

#[test]
fn oversized_reservation_is_refused_and_store_keeps_minting() {
    let mut store = NativeQueryFreshIdStore::new();
    store.next_fresh_id().expect("id space");
    let err = store.reserve(u64::MAX).expect_err("counter would overflow");
    assert_eq!(err.code(), "FreshIdSpaceExhausted");

    let mut writer = SelectWriter::default();
    let alias = writer
        .register_native_query(&mut store, "recent_posts", recent_posts_query(7))
        .expect("store still usable");
    assert_eq!(alias.identifier().as_str(), "cte_recent_posts_1");
}

#[test]
fn long_native_query_names_are_truncated_deterministically() {
    let name = "a".repeat(80);
    let first = NativeQueryFreshIdStore::new().mint_alias(&name).expect("id space");
    let again = NativeQueryFreshIdStore::new().mint_alias(&name).expect("id space");
    assert_eq!(first, again);
    assert!(first.identifier().as_str().len() <= 63);
    assert!(first.identifier().as_str().starts_with("cte_aaaa"));
}

#[test]
fn tell_cte_keeps_the_first_query_for_an_alias() {
    let mut writer = SelectWriter::default();
    let alias = TableAlias::new("cte_recent_0");
    writer.tell_cte(alias.clone(), recent_posts_query(7));
    writer.tell_cte(alias.clone(), recent_posts_query(30));
    assert_eq!(writer.ctes.get(&alias), Some(&recent_posts_query(7)));
}

#[test]
fn strict_writer_merge_rejects_duplicate_cte() {
    let alias = TableAlias::new("cte_recent_0");
    let mut left = SelectWriter::default();
    left.tell_cte(alias.clone(), recent_posts_query(7));
    let mut right = SelectWriter::default();
    right.tell_cte(alias, recent_posts_query(30));
    let err = left.try_merge(right).expect_err("duplicate alias");
    assert_eq!(err.code(), "DuplicateCte");
}

#[test]
fn writer_accumulates_join_trees() {
    let mut writer = SelectWriter::default();
    writer.tell_join_tree(JoinTree::object_relation(
        author_relation(Nullable::Nullable),
        SelectNode::with_extractors([(ColumnAlias::new("id"), Expr::column("id"))]),
    ));
    writer.tell_join_tree(JoinTree::object_relation(
        author_relation(Nullable::Nullable),
        SelectNode::with_extractors([(ColumnAlias::new("name"), Expr::column("name"))]),
    ));
    writer.tell_join_tree(JoinTree::array_relation(
        posts_relation(None),
        MultiRowSelectNode::default(),
    ));
    assert_eq!(writer.join_tree.len(), 2);
    let author = &writer.join_tree.object_relations[&author_relation(Nullable::Nullable)];
    assert_eq!(author.extractors.len(), 2);
}

#[test]
fn config_file_drives_alias_prefix_and_strictness() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "strict_merge = true").expect("write");
    writeln!(file, "native_query_alias_prefix = \"nq_\"").expect("write");
    let config = PlannerConfig::load(file.path()).expect("config loads");

    let mut store = config.fresh_id_store();
    let alias = store.mint_alias("top").expect("id space");
    assert_eq!(alias.identifier().as_str(), "nq_top_0");

    let err = SelectNodeBuilder::with_config(&config)
        .extract("id", Expr::column("id"))
        .extract("id", Expr::column("uuid"))
        .build()
        .expect_err("strict config rejects conflicts");
    assert_eq!(err.code(), "ConflictingExtractor");
}

#[test]
fn missing_config_file_reports_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");
    let err = PlannerConfig::load(&path).expect_err("missing file");
    match err {
        ConfigError::Read { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_config_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "max_identifier_len = \"long\"").expect("write");
    let err = PlannerConfig::load(file.path()).expect_err("bad type");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn explain_serializes_and_hash_is_stable() {
    let mut store = NativeQueryFreshIdStore::new();
    let mut writer = SelectWriter::from_join_tree(
        JoinTree::object_relation(
            author_relation(Nullable::NotNullable),
            SelectNode::with_extractors([(ColumnAlias::new("name"), Expr::column("name"))]),
        )
        .merge(JoinTree::array_relation(
            posts_relation(Some(5)),
            MultiRowSelectNode::default(),
        )),
    );
    writer
        .register_native_query(&mut store, "recent_posts", recent_posts_query(7))
        .expect("id space");

    let explain = writer.explain();
    assert_eq!(explain.plan_hash, writer.clone().explain().plan_hash);

    let json = serde_json::to_value(&explain).expect("serialize explain");
    assert_eq!(json["root"]["op"], "SelectWriter");
    assert_eq!(json["root"]["inputs"][0]["op"], "Cte");
    let joins = &json["root"]["inputs"][1]["inputs"];
    assert_eq!(joins[0]["op"], "ArrayRelation");
    assert_eq!(joins[1]["op"], "ObjectRelation");
    assert!(json["plan_hash"].is_u64());
}
