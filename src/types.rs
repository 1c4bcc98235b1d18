//! Crate-wide error type and result alias.

use thiserror::Error;

/// Result alias used throughout the planner IR.
pub type Result<T> = std::result::Result<T, PlanError>;

/// Errors surfaced while assembling a select plan.
///
/// The merge operators are total and never produce these; they come from
/// constructors fed with untrusted numbers, the strict merge variants, alias
/// validation, and the fresh-id counters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// LIMIT must be a positive integer.
    #[error("limit must be positive (got {0})")]
    NonPositiveLimit(i64),
    /// OFFSET cannot be negative.
    #[error("offset cannot be negative (got {0})")]
    NegativeOffset(i64),
    /// Two sub-plans bound the same output alias to different expressions.
    #[error("extractor alias '{alias}' bound to conflicting expressions")]
    ConflictingExtractor {
        /// Output column alias in conflict.
        alias: String,
    },
    /// Two different relation descriptors at one level bind the same join alias.
    #[error("join alias '{alias}' used by two different relations")]
    AliasCollision {
        /// Join alias in conflict.
        alias: String,
    },
    /// Two different native queries were registered under the same CTE alias.
    #[error("cte alias '{alias}' registered with two different queries")]
    DuplicateCte {
        /// CTE alias in conflict.
        alias: String,
    },
    /// A reserved block of fresh ids has been used up.
    #[error("fresh id block [{start}, {end}) exhausted")]
    FreshIdBlockExhausted {
        /// First id of the block.
        start: u64,
        /// One past the last id of the block.
        end: u64,
    },
    /// The store's id counter cannot advance by the requested amount.
    #[error("fresh id space exhausted: cannot take {requested} ids after {next}")]
    FreshIdSpaceExhausted {
        /// Id the store would hand out next.
        next: u64,
        /// Number of ids requested.
        requested: u64,
    },
    /// An identifier was empty.
    #[error("{context} identifier cannot be empty")]
    EmptyIdentifier {
        /// Where the identifier was supplied.
        context: &'static str,
    },
}

impl PlanError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::NonPositiveLimit(_) => "NonPositiveLimit",
            PlanError::NegativeOffset(_) => "NegativeOffset",
            PlanError::ConflictingExtractor { .. } => "ConflictingExtractor",
            PlanError::AliasCollision { .. } => "AliasCollision",
            PlanError::DuplicateCte { .. } => "DuplicateCte",
            PlanError::FreshIdBlockExhausted { .. } => "FreshIdBlockExhausted",
            PlanError::FreshIdSpaceExhausted { .. } => "FreshIdSpaceExhausted",
            PlanError::EmptyIdentifier { .. } => "EmptyIdentifier",
        }
    }
}
