//! Splits a select's sorting and slicing policy across the base (row scan)
//! and node (aggregation) layers.
//!
//! Slicing is applied exactly once. It lands on the base layer unless the
//! policy carries an ordering that exists only at the node layer, in which
//! case the node layer both orders and slices.

use crate::query::sorting::{
    DistinctAndOrderByExpr, SelectSlicing, SelectSorting, SortingAndSlicing,
};
use crate::query::sql::{DistinctExpr, OrderByExpr};
use tracing::trace;

/// What one query layer must apply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerPolicy {
    /// ORDER BY for this layer.
    pub order_by: Option<OrderByExpr>,
    /// LIMIT/OFFSET for this layer.
    pub slicing: SelectSlicing,
    /// DISTINCT / DISTINCT ON for this layer.
    pub distinct: Option<DistinctExpr>,
}

impl LayerPolicy {
    /// Returns true when the layer applies nothing.
    pub fn is_empty(&self) -> bool {
        self.order_by.is_none() && self.slicing.is_empty() && self.distinct.is_none()
    }
}

/// Per-layer split of a [`SortingAndSlicing`] policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    /// Applied to the raw row scan.
    pub at_base: LayerPolicy,
    /// Applied to the outer aggregation/wrapping layer.
    pub at_node: LayerPolicy,
}

/// Decides at which layer ordering, distinct and slicing are applied.
pub fn apply_sorting_and_slicing(policy: &SortingAndSlicing) -> Placement {
    let slicing = policy.slicing;
    let placement = match &policy.sorting {
        SelectSorting::NoSorting(distinct) => Placement {
            at_base: LayerPolicy {
                order_by: None,
                slicing,
                distinct: distinct.clone(),
            },
            at_node: LayerPolicy::default(),
        },
        SelectSorting::Sorting(DistinctAndOrderByExpr {
            at_node: (node_order, node_distinct),
            at_base: Some((base_order, base_distinct)),
        }) => Placement {
            at_base: LayerPolicy {
                order_by: Some(base_order.clone()),
                slicing,
                distinct: base_distinct.clone(),
            },
            at_node: LayerPolicy {
                order_by: Some(node_order.clone()),
                slicing: SelectSlicing::none(),
                distinct: node_distinct.clone(),
            },
        },
        SelectSorting::Sorting(DistinctAndOrderByExpr {
            at_node: (node_order, node_distinct),
            at_base: None,
        }) => Placement {
            at_base: LayerPolicy::default(),
            at_node: LayerPolicy {
                order_by: Some(node_order.clone()),
                slicing,
                distinct: node_distinct.clone(),
            },
        },
    };
    trace!(
        slicing_at_base = !placement.at_base.slicing.is_empty(),
        slicing_at_node = !placement.at_node.slicing.is_empty(),
        "placement.sorting_and_slicing"
    );
    placement
}
