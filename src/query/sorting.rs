//! Sorting and slicing policy attached to every select-source.

use crate::query::sql::{DistinctExpr, OrderByExpr};
use crate::types::{PlanError, Result};

/// LIMIT/OFFSET pair. Absence of both means "no slicing".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectSlicing {
    /// Maximum number of rows. Caller-supplied limits are positive; only a
    /// permission limit can bring it down to zero.
    pub limit: Option<u64>,
    /// Number of leading rows skipped.
    pub offset: Option<u64>,
}

impl SelectSlicing {
    /// Slicing that keeps every row.
    pub const fn none() -> Self {
        Self {
            limit: None,
            offset: None,
        }
    }

    /// The single-row cap applied to to-one relations.
    pub const fn limit_one() -> Self {
        Self {
            limit: Some(1),
            offset: None,
        }
    }

    /// Validates raw LIMIT/OFFSET values as supplied by a caller.
    pub fn try_new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let limit = match limit {
            Some(raw) if raw > 0 => Some(raw.unsigned_abs()),
            Some(raw) => return Err(PlanError::NonPositiveLimit(raw)),
            None => None,
        };
        let offset = match offset {
            Some(raw) => Some(u64::try_from(raw).map_err(|_| PlanError::NegativeOffset(raw))?),
            None => None,
        };
        Ok(Self { limit, offset })
    }

    /// Returns true when neither LIMIT nor OFFSET is set.
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    /// Folds a permission-imposed row limit into this slicing.
    ///
    /// The tighter of the caller's limit and the permission limit wins. A
    /// permission limit of zero is kept as `LIMIT 0`.
    pub fn with_permission_limit(self, permission: PermissionLimitSubQuery) -> Self {
        let PermissionLimitSubQuery::Required(perm) = permission else {
            return self;
        };
        let limit = match self.limit {
            Some(user) => user.min(perm),
            None => perm,
        };
        Self {
            limit: Some(limit),
            offset: self.offset,
        }
    }
}

/// Row-limit decision handed over by the permission evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionLimitSubQuery {
    /// Rows must be capped at this many.
    Required(u64),
    /// No permission-imposed cap.
    NotRequired,
}

/// Order-by plus optional distinct-on pair for one query layer.
pub type LayerSorting = (OrderByExpr, Option<DistinctExpr>);

/// A sort requirement that may need to be expressed at one or two layers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DistinctAndOrderByExpr {
    /// Ordering (and distinct) at the node/aggregation layer.
    pub at_node: LayerSorting,
    /// Ordering (and distinct) at the base row-scan layer, when the scan
    /// itself must be ordered or deduplicated.
    pub at_base: Option<LayerSorting>,
}

impl DistinctAndOrderByExpr {
    /// Ordering that only applies at the node layer.
    pub fn at_node(order_by: OrderByExpr, distinct: Option<DistinctExpr>) -> Self {
        Self {
            at_node: (order_by, distinct),
            at_base: None,
        }
    }

    /// Adds a base-layer ordering.
    pub fn with_base(mut self, order_by: OrderByExpr, distinct: Option<DistinctExpr>) -> Self {
        self.at_base = Some((order_by, distinct));
        self
    }
}

/// How a select orders and deduplicates its rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelectSorting {
    /// No ordering requirement; optional distinct applies to the raw scan.
    NoSorting(Option<DistinctExpr>),
    /// Explicit ordering requirement.
    Sorting(DistinctAndOrderByExpr),
}

impl Default for SelectSorting {
    fn default() -> Self {
        SelectSorting::NoSorting(None)
    }
}

/// The single authoritative ordering/slicing policy of a select-source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SortingAndSlicing {
    /// Ordering and distinct requirement.
    pub sorting: SelectSorting,
    /// Row window.
    pub slicing: SelectSlicing,
}

impl SortingAndSlicing {
    /// Creates a policy from its parts.
    pub fn new(sorting: SelectSorting, slicing: SelectSlicing) -> Self {
        Self { sorting, slicing }
    }

    /// Policy used for to-one relations: unsorted, capped at one row.
    pub fn single_row() -> Self {
        Self {
            sorting: SelectSorting::NoSorting(None),
            slicing: SelectSlicing::limit_one(),
        }
    }
}
