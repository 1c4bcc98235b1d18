//! Planner configuration loaded from TOML.

use crate::query::prefix::{PrefixAllocator, DEFAULT_MAX_IDENTIFIER_LEN};
use crate::query::writer::{NativeQueryFreshIdStore, NATIVE_QUERY_ALIAS_PREFIX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Knobs that influence how sub-plans are built and combined.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Reject conflicting extractors, alias collisions and duplicate CTEs
    /// instead of keeping the first binding.
    pub strict_merge: bool,
    /// Longest identifier the target database accepts.
    pub max_identifier_len: usize,
    /// Prefix of aliases minted for native queries.
    pub native_query_alias_prefix: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strict_merge: false,
            max_identifier_len: DEFAULT_MAX_IDENTIFIER_LEN,
            native_query_alias_prefix: NATIVE_QUERY_ALIAS_PREFIX.to_owned(),
        }
    }
}

/// Failure to load a [`PlannerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Inline TOML text is malformed or names an unknown key.
    #[error("failed to parse config: {source}")]
    ParseStr {
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The config file is malformed or names an unknown key.
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The identifier limit leaves no room for a hashed suffix.
    #[error("max_identifier_len must be at least {min}, got {value}")]
    IdentifierLimitTooSmall {
        /// Configured limit.
        value: usize,
        /// Smallest accepted limit.
        min: usize,
    },
    /// Native query aliases need a non-empty prefix.
    #[error("native_query_alias_prefix must not be empty")]
    EmptyAliasPrefix,
}

impl PlannerConfig {
    /// Parses a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig =
            toml::from_str(contents).map_err(|source| ConfigError::ParseStr { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PlannerConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let min = PrefixAllocator::MIN_MAX_LEN;
        if self.max_identifier_len < min {
            return Err(ConfigError::IdentifierLimitTooSmall {
                value: self.max_identifier_len,
                min,
            });
        }
        if self.native_query_alias_prefix.is_empty() {
            return Err(ConfigError::EmptyAliasPrefix);
        }
        Ok(())
    }

    /// Prefix allocator honouring the configured identifier limit.
    pub fn allocator(&self) -> PrefixAllocator {
        PrefixAllocator::new(self.max_identifier_len)
    }

    /// Fresh-id store using the configured alias prefix and identifier limit.
    pub fn fresh_id_store(&self) -> NativeQueryFreshIdStore {
        NativeQueryFreshIdStore::with_settings(&*self.native_query_alias_prefix, self.allocator())
    }
}
