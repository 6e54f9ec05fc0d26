//! Error types for cache operations.

use std::path::PathBuf;

use pixcache_config::ConfigError;

/// Errors that can occur during cache operations.
///
/// Most caching problems never reach the caller: arguments that cannot be
/// keyed and a full store both degrade to plain recomputation. The variants
/// here are the failures that do surface, because hiding them could return
/// wrong results or leave the cache half-open.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store could not be opened or created.
    #[error("cache store unavailable at {path}: {reason}")]
    StoreUnavailable {
        /// The store path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A store transaction failed for a reason other than capacity.
    #[error("cache store transaction failed: {reason}")]
    Store {
        /// Description of the failure.
        reason: String,
    },

    /// A stored value could not be decoded.
    #[error("corrupt cache entry {key}: {reason}")]
    CorruptEntry {
        /// The entry key, hex encoded (with a `/index` suffix for sequences).
        key: String,
        /// Description of the decode failure.
        reason: String,
    },

    /// The cache configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<heed::Error> for CacheError {
    fn from(e: heed::Error) -> Self {
        CacheError::Store {
            reason: e.to_string(),
        }
    }
}
