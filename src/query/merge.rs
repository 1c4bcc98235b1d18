//! Associative combination of independently built sub-plans.
//!
//! Every composite in the IR forms a monoid: `merge` is associative and
//! `empty()` is its identity, so sub-plans may be folded in any grouping
//! with the same result.

use crate::types::Result;

/// Associative combine with an identity element.
pub trait Merge: Sized {
    /// The identity element.
    fn empty() -> Self;

    /// Combines `self` with `other`. Never fails; on conflicting entries the
    /// left operand wins.
    fn merge(self, other: Self) -> Self;
}

/// Strict counterpart of [`Merge`] that rejects conflicting entries instead
/// of resolving them.
pub trait TryMerge: Merge {
    /// Combines `self` with `other`, failing on the first conflict.
    fn try_merge(self, other: Self) -> Result<Self>;
}

/// Folds any number of values with [`Merge::merge`].
pub fn merge_all<T, I>(items: I) -> T
where
    T: Merge,
    I: IntoIterator<Item = T>,
{
    items.into_iter().fold(T::empty(), T::merge)
}

/// Folds any number of values with [`TryMerge::try_merge`].
pub fn try_merge_all<T, I>(items: I) -> Result<T>
where
    T: TryMerge,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .try_fold(T::empty(), |acc, item| acc.try_merge(item))
}
