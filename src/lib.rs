//! Relational plan IR for compiling GraphQL selections into SQL.
//!
//! The crate sits between schema resolution and SQL rendering: it models
//! select sources, nested relations and the join tree, decides where
//! ordering and slicing are applied, and tracks native queries inlined as
//! CTEs.

#![warn(missing_docs)]

pub mod query;
pub mod types;

pub use types::{PlanError, Result};
