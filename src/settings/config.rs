//! Query Configuration
//!
//! Limits and cache defaults for generated resolvers.

use serde::{Deserialize, Serialize};

/// Default limit if none is specified
pub const DEFAULT_LIMIT: usize = 100;

/// Maximum number of documents a multi fetch may request
pub const MAX_LIMIT: usize = 1000;

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Limit applied when the caller gives none (default: 100)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest accepted limit (default: 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Cache hint in seconds when a caller enables caching (default: 300)
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u32,

    /// Whether multi fetches compute a total count unless told otherwise
    #[serde(default = "default_enable_total")]
    pub enable_total_by_default: bool,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_limit() -> usize {
    MAX_LIMIT
}

fn default_cache_max_age() -> u32 {
    300
}

fn default_enable_total() -> bool {
    true
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            cache_max_age: default_cache_max_age(),
            enable_total_by_default: default_enable_total(),
        }
    }
}

impl QueryConfig {
    /// Create a config with a specific default limit
    pub fn with_default_limit(default_limit: usize) -> Self {
        Self {
            default_limit,
            ..Default::default()
        }
    }
}
