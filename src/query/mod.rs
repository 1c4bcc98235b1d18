#![forbid(unsafe_code)]

//! Intermediate representation between a resolved GraphQL selection and the
//! SQL renderer.
//!
//! Sub-plans for each selection field are built independently and combined
//! with [`merge::Merge`]; identical relation occurrences collapse into one
//! join, and ordering/slicing is assigned to exactly one query layer.

/// Leaf SQL vocabulary: identifiers, expressions, predicates, FROM items.
pub mod sql;

/// Alias allocation for nested selects.
///
/// Derives child aliases from the parent and keeps them within the
/// database's identifier length limit.
pub mod prefix;

/// Ordering, distinct and LIMIT/OFFSET policy.
pub mod sorting;

/// Assignment of ordering and slicing to the base or node layer.
pub mod placement;

/// Row scans and the to-one scan variant.
pub mod source;

/// Relation descriptors used as join-tree keys.
pub mod relation;

/// Monoid seam shared by every composite of the IR.
pub mod merge;

/// Output columns and the nodes that carry them.
pub mod node;

/// Nested relations keyed by descriptor.
pub mod join_tree;

/// Join tree plus the CTE registry and fresh-id store.
pub mod writer;

/// Planner configuration.
pub mod config;

/// Fluent select-node construction.
pub mod builder;

/// Explain trees and deterministic plan hashes.
pub mod explain;

pub use builder::SelectNodeBuilder;
pub use config::{ConfigError, PlannerConfig};
pub use explain::{explain_join_tree, ExplainNode, ExplainProp, PlanExplain};
pub use join_tree::JoinTree;
pub use merge::{merge_all, try_merge_all, Merge, TryMerge};
pub use node::{Extractors, MultiRowSelectNode, SelectNode};
pub use placement::{apply_sorting_and_slicing, LayerPolicy, Placement};
pub use prefix::{PrefixAllocator, SourcePrefixes};
pub use relation::{
    ArrayConnectionSource, ArrayRelationSource, ComputedFieldTableSetSource, ConnectionSlice,
    Nullable, ObjectRelationSource, RelationKey,
};
pub use sorting::{
    DistinctAndOrderByExpr, PermissionLimitSubQuery, SelectSlicing, SelectSorting,
    SortingAndSlicing,
};
pub use source::{order_by_for_json_aggregate, ObjectSelectSource, SelectSource};
pub use writer::{CustomSqlCtes, FreshIdBlock, NativeQueryFreshIdStore, SelectWriter};
