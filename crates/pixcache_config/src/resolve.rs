//! Store path resolution.

use crate::error::ConfigError;
use crate::types::{CacheConfig, PATH_ENV};
use std::path::{Path, PathBuf};

/// Directory created under the user cache home.
pub const CACHE_SUBDIR: &str = "pixcache";

/// Name of the store directory inside [`CACHE_SUBDIR`].
pub const STORE_NAME: &str = "cache.lmdb";

/// Resolves the store path for `config`.
///
/// An explicit `path` wins. Otherwise the store lives at
/// `<cache home>/pixcache/cache.lmdb`, where the cache home is
/// `$XDG_CACHE_HOME` or `$HOME/.cache` on Linux and the platform equivalent
/// elsewhere.
pub fn resolve_store_path(config: &CacheConfig) -> Result<PathBuf, ConfigError> {
    resolve_store_path_in(config, dirs::cache_dir().as_deref())
}

/// Resolves the store path against an explicit cache home.
pub fn resolve_store_path_in(
    config: &CacheConfig,
    cache_home: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = &config.path {
        return Ok(path.clone());
    }
    let home = cache_home.ok_or(ConfigError::NoCacheHome(PATH_ENV))?;
    Ok(home.join(CACHE_SUBDIR).join(STORE_NAME))
}
