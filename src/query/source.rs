//! Single table/subquery scans and their ordering policy.

use crate::query::placement::{apply_sorting_and_slicing, Placement};
use crate::query::sorting::{SelectSorting, SortingAndSlicing};
use crate::query::sql::{BoolExpr, FromItem, Identifier, OrderByExpr};

/// A row scan: where rows come from, which survive, and how they are ordered
/// and windowed.
///
/// Equality and hashing cover every field; two sources are interchangeable
/// only when all of them match.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SelectSource {
    /// Alias the scan is bound to.
    pub prefix: Identifier,
    /// Row source.
    pub from: FromItem,
    /// Row filter.
    pub where_: BoolExpr,
    /// Ordering and slicing policy.
    pub policy: SortingAndSlicing,
}

impl SelectSource {
    /// Creates a select source.
    pub fn new(
        prefix: Identifier,
        from: FromItem,
        where_: BoolExpr,
        policy: SortingAndSlicing,
    ) -> Self {
        Self {
            prefix,
            from,
            where_,
            policy,
        }
    }

    /// Layer assignment of this source's ordering and slicing.
    pub fn placement(&self) -> Placement {
        apply_sorting_and_slicing(&self.policy)
    }

    /// Ordering to use inside a JSON array aggregate over this source.
    pub fn order_by_for_json_aggregate(&self) -> Option<&OrderByExpr> {
        match &self.policy.sorting {
            SelectSorting::NoSorting(_) => None,
            SelectSorting::Sorting(sorting) => Some(&sorting.at_node.0),
        }
    }
}

/// Free-function form of [`SelectSource::order_by_for_json_aggregate`].
pub fn order_by_for_json_aggregate(source: &SelectSource) -> Option<OrderByExpr> {
    source.order_by_for_json_aggregate().cloned()
}

/// Scan behind a to-one relation. It carries no ordering policy of its own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectSelectSource {
    /// Alias the scan is bound to.
    pub prefix: Identifier,
    /// Row source.
    pub from: FromItem,
    /// Row filter.
    pub where_: BoolExpr,
}

impl ObjectSelectSource {
    /// Creates an object select source.
    pub fn new(prefix: Identifier, from: FromItem, where_: BoolExpr) -> Self {
        Self {
            prefix,
            from,
            where_,
        }
    }

    /// Converts to a general source, always unsorted and capped at one row.
    ///
    /// A declared to-one relation that is really to-many must still yield a
    /// single row; which row wins is unspecified.
    pub fn to_select_source(&self) -> SelectSource {
        SelectSource::from(self.clone())
    }
}

impl From<ObjectSelectSource> for SelectSource {
    fn from(source: ObjectSelectSource) -> Self {
        SelectSource {
            prefix: source.prefix,
            from: source.from,
            where_: source.where_,
            policy: SortingAndSlicing::single_row(),
        }
    }
}
