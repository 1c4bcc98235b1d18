//! Scoped alias allocation for nested selects.
//!
//! Every select-source is addressed through a pair of identifiers: the alias
//! of its own (possibly aggregated) row source and the alias of the raw table
//! scan underneath it. Nested relations derive their aliases from the parent's
//! so siblings and descendants never collide.

use crate::query::sql::{Identifier, TableAlias};
use std::hash::Hasher;
use xxhash_rust::xxh64::Xxh64;

/// Longest identifier PostgreSQL keeps without silent truncation.
pub const DEFAULT_MAX_IDENTIFIER_LEN: usize = 63;

const BASE_SUFFIX: &str = "_base";
const HASH_SUFFIX_LEN: usize = 17;

/// Pair of scoped names a select-source uses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourcePrefixes {
    /// Alias of this select's own row source.
    pub current: Identifier,
    /// Alias of the underlying table scan.
    pub base: Identifier,
}

impl SourcePrefixes {
    /// Derives the base alias from `current` using the default length limit.
    pub fn new(current: Identifier) -> Self {
        PrefixAllocator::default().source_prefixes(current)
    }
}

/// Mints aliases for nested relations, keeping each within the identifier
/// length limit.
#[derive(Clone, Copy, Debug)]
pub struct PrefixAllocator {
    max_len: usize,
}

impl Default for PrefixAllocator {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_IDENTIFIER_LEN,
        }
    }
}

impl PrefixAllocator {
    /// Smallest limit that still leaves room for one byte before the hash suffix.
    pub const MIN_MAX_LEN: usize = HASH_SUFFIX_LEN + 1;

    /// Creates an allocator with a custom identifier length limit.
    ///
    /// Limits shorter than the hash suffix are raised to fit it.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(Self::MIN_MAX_LEN),
        }
    }

    /// Identifier length limit in bytes.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Builds the (current, base) pair for a select-source.
    pub fn source_prefixes(&self, current: Identifier) -> SourcePrefixes {
        let current = self.fit(current.0);
        let base = self.fit(format!("{}{BASE_SUFFIX}", current.0));
        SourcePrefixes { current, base }
    }

    /// Alias of an object (to-one) relation nested under `parent`.
    pub fn object_relation(&self, parent: &Identifier, relationship: &str) -> Identifier {
        self.nested(parent, "or", relationship)
    }

    /// Alias of an array (to-many) relation nested under `parent`.
    pub fn array_relation(&self, parent: &Identifier, field_alias: &str) -> TableAlias {
        TableAlias(self.nested(parent, "ar", field_alias))
    }

    /// Alias of a paginated connection nested under `parent`.
    pub fn array_connection(&self, parent: &Identifier, field_alias: &str) -> TableAlias {
        TableAlias(self.nested(parent, "ac", field_alias))
    }

    /// Alias of a function-backed table set nested under `parent`.
    pub fn computed_field(&self, parent: &Identifier, field_alias: &str) -> Identifier {
        self.nested(parent, "cf", field_alias)
    }

    fn nested(&self, parent: &Identifier, kind: &str, name: &str) -> Identifier {
        self.fit(format!("{}.{kind}.{name}", parent.0))
    }

    /// Applies the length limit, replacing the tail of an over-long name with
    /// a hash of the full name.
    pub fn fit(&self, name: String) -> Identifier {
        if name.len() <= self.max_len {
            return Identifier(name);
        }
        let mut hasher = Xxh64::new(0);
        hasher.write(name.as_bytes());
        let digest = hasher.finish();
        let mut keep = self.max_len - HASH_SUFFIX_LEN;
        while !name.is_char_boundary(keep) {
            keep -= 1;
        }
        Identifier(format!("{}_{digest:016x}", &name[..keep]))
    }
}
