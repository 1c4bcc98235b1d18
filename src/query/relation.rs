//! Relation source descriptors: the keys of a join tree.
//!
//! A descriptor identifies one nested relation occurrence. Equality and
//! hashing are structural over every field, so only truly identical
//! occurrences coalesce when join trees are merged.

use crate::query::source::{ObjectSelectSource, SelectSource};
use crate::query::sql::{BoolExpr, Column, Identifier, TableAlias};
use std::collections::BTreeMap;
use std::hash::Hash;

/// Correlation from parent columns to child columns.
pub type ColumnMapping = BTreeMap<Column, Column>;

/// Whether a to-one relation may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Nullable {
    /// The related row may be missing; the renderer emits an outer join.
    #[default]
    Nullable,
    /// The related row always exists.
    NotNullable,
}

/// Cursor-style window over a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionSlice {
    /// First `n` rows after the cursor.
    First(u64),
    /// Last `n` rows before the cursor.
    Last(u64),
}

/// To-one relation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRelationSource {
    /// Relationship name.
    pub name: String,
    /// Parent-to-child column correlation.
    pub column_mapping: ColumnMapping,
    /// Scan of the related table.
    pub source: ObjectSelectSource,
    /// Whether the related row may be absent.
    pub nullable: Nullable,
}

/// Plain to-many relation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayRelationSource {
    /// Alias the aggregated rows are bound to.
    pub alias: TableAlias,
    /// Parent-to-child column correlation.
    pub column_mapping: ColumnMapping,
    /// Scan of the related table.
    pub source: SelectSource,
}

/// Paginated to-many relation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayConnectionSource {
    /// Alias the aggregated page is bound to.
    pub alias: TableAlias,
    /// Parent-to-child column correlation.
    pub column_mapping: ColumnMapping,
    /// Cursor predicate separating this page from the rest.
    pub split_filter: Option<BoolExpr>,
    /// First/last window.
    pub slice: Option<ConnectionSlice>,
    /// Scan of the related table.
    pub source: SelectSource,
}

/// To-many relation produced by a schema function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComputedFieldTableSetSource {
    /// Output field the set is exposed under.
    pub field_name: String,
    /// Scan over the function's result set.
    pub source: SelectSource,
}

/// Key half of a join-tree entry.
pub trait RelationKey: Eq + Hash {
    /// Operator name used in logs and explain output.
    const KIND: &'static str;

    /// Identifier the renderer binds this relation's join to.
    fn join_alias(&self) -> &Identifier;
}

impl RelationKey for ObjectRelationSource {
    const KIND: &'static str = "ObjectRelation";

    fn join_alias(&self) -> &Identifier {
        &self.source.prefix
    }
}

impl RelationKey for ArrayRelationSource {
    const KIND: &'static str = "ArrayRelation";

    fn join_alias(&self) -> &Identifier {
        self.alias.identifier()
    }
}

impl RelationKey for ArrayConnectionSource {
    const KIND: &'static str = "ArrayConnection";

    fn join_alias(&self) -> &Identifier {
        self.alias.identifier()
    }
}

impl RelationKey for ComputedFieldTableSetSource {
    const KIND: &'static str = "ComputedFieldTableSet";

    fn join_alias(&self) -> &Identifier {
        &self.source.prefix
    }
}

/// Builds a column mapping from `(parent, child)` pairs.
pub fn column_mapping<I, P, C>(pairs: I) -> ColumnMapping
where
    I: IntoIterator<Item = (P, C)>,
    P: Into<Column>,
    C: Into<Column>,
{
    pairs
        .into_iter()
        .map(|(parent, child)| (parent.into(), child.into()))
        .collect()
}
