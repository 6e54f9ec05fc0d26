//! Shared configuration resolution for CLI commands.

use std::path::{Path, PathBuf};

use pixcache_config::{apply_env, load_config, resolve_store_path, CacheConfig};

use crate::GlobalArgs;

/// Loads the config named by `--config` (or the defaults) and overlays the
/// environment.
pub fn load(global: &GlobalArgs) -> Result<CacheConfig, Box<dyn std::error::Error>> {
    let mut config = match &global.config {
        Some(path) => load_config(Path::new(path))?,
        None => CacheConfig::default(),
    };
    apply_env(&mut config)?;
    Ok(config)
}

/// Resolves the store directory for `config`.
///
/// The disable switch is ignored here: maintenance commands always act on
/// the configured store.
pub fn store_path(config: &CacheConfig) -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(resolve_store_path(config)?)
}

/// Returns `true` if an LMDB environment has been created at `path`.
pub fn store_exists(path: &Path) -> bool {
    path.join("data.mdb").is_file()
}
