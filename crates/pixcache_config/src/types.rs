//! Configuration types deserialized from `pixcache.toml`.

use pixcache_common::ByteSize;
use serde::Deserialize;
use std::path::PathBuf;

/// Default store capacity.
pub const DEFAULT_MAX_SIZE: ByteSize = ByteSize::GIB;

/// Environment variable that, when set to a non-empty value, turns caching
/// off for the whole process.
pub const DISABLE_ENV: &str = "PIXCACHE_DISABLE_CACHING";

/// Environment variable overriding the store path.
pub const PATH_ENV: &str = "PIXCACHE_CACHE_PATH";

/// Environment variable overriding the store capacity.
pub const MAX_SIZE_ENV: &str = "PIXCACHE_MAX_SIZE";

/// The top-level contents of a `pixcache.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Store settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Settings for opening the persistent memoization store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Store directory. `None` means the default under the user cache home.
    pub path: Option<PathBuf>,
    /// Hard capacity ceiling of the store.
    pub max_size: ByteSize,
    /// Disable caching entirely; memoized functions always run.
    pub disabled: bool,
}

impl CacheConfig {
    /// A configuration storing at `path` with default capacity.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// A configuration with caching turned off.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Returns this configuration with a different capacity.
    pub fn with_max_size(mut self, max_size: ByteSize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_size: DEFAULT_MAX_SIZE,
            disabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_gib_enabled() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, ByteSize::GIB);
        assert!(!config.disabled);
        assert!(config.path.is_none());
    }

    #[test]
    fn builders() {
        let config = CacheConfig::at("/tmp/x").with_max_size(ByteSize::mib(4));
        assert_eq!(config.path, Some(PathBuf::from("/tmp/x")));
        assert_eq!(config.max_size, ByteSize::mib(4));
        assert!(CacheConfig::disabled().disabled);
    }
}
