//! Configuration file loading, environment overlay and validation.

use crate::error::ConfigError;
use crate::types::{CacheConfig, ConfigFile, DISABLE_ENV, MAX_SIZE_ENV, PATH_ENV};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Loads and validates a `pixcache.toml` configuration file.
pub fn load_config(path: &Path) -> Result<CacheConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `pixcache.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<CacheConfig, ConfigError> {
    let file: ConfigFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&file.cache)?;
    Ok(file.cache)
}

/// Overlays the process environment onto `config`.
pub fn apply_env(config: &mut CacheConfig) -> Result<(), ConfigError> {
    apply_env_with(config, |key| std::env::var_os(key))
}

/// Overlays environment values obtained from `lookup` onto `config`.
///
/// A non-empty [`DISABLE_ENV`] disables caching; [`PATH_ENV`] and
/// [`MAX_SIZE_ENV`] override the store path and capacity.
pub fn apply_env_with<F>(config: &mut CacheConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    if lookup(DISABLE_ENV).is_some_and(|v| !v.is_empty()) {
        config.disabled = true;
    }
    if let Some(path) = lookup(PATH_ENV).filter(|v| !v.is_empty()) {
        config.path = Some(PathBuf::from(path));
    }
    if let Some(size) = lookup(MAX_SIZE_ENV).filter(|v| !v.is_empty()) {
        let size = size.to_string_lossy();
        config.max_size = size.parse().map_err(|e| ConfigError::InvalidSize {
            field: MAX_SIZE_ENV.to_string(),
            reason: format!("{e}"),
        })?;
    }
    validate_config(config)
}

/// Validates that configuration values are usable.
fn validate_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.max_size.bytes() == 0 {
        return Err(ConfigError::ValidationError(
            "cache.max_size must be non-zero".to_string(),
        ));
    }
    if config
        .path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "cache.path must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixcache_common::ByteSize;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[cache]
path = "/var/cache/pixcache/cache.lmdb"
max_size = "512MiB"
disabled = true
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(
            config.path,
            Some(PathBuf::from("/var/cache/pixcache/cache.lmdb"))
        );
        assert_eq!(config.max_size, ByteSize::mib(512));
        assert!(config.disabled);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn numeric_max_size() {
        let config = load_config_from_str("[cache]\nmax_size = 1048576\n").unwrap();
        assert_eq!(config.max_size, ByteSize::mib(1));
    }

    #[test]
    fn zero_size_rejected() {
        let err = load_config_from_str("[cache]\nmax_size = \"0B\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_size_is_parse_error() {
        let err = load_config_from_str("[cache]\nmax_size = \"huge\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_key_rejected() {
        let err = load_config_from_str("[cache]\nmax_entries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn env_disables_caching() {
        let mut config = CacheConfig::default();
        apply_env_with(&mut config, env(&[(DISABLE_ENV, "1")])).unwrap();
        assert!(config.disabled);
    }

    #[test]
    fn empty_disable_var_is_ignored() {
        let mut config = CacheConfig::default();
        apply_env_with(&mut config, env(&[(DISABLE_ENV, "")])).unwrap();
        assert!(!config.disabled);
    }

    #[test]
    fn env_overrides_path_and_size() {
        let mut config = CacheConfig::at("/from/file");
        apply_env_with(
            &mut config,
            env(&[(PATH_ENV, "/from/env"), (MAX_SIZE_ENV, "2MiB")]),
        )
        .unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/from/env")));
        assert_eq!(config.max_size, ByteSize::mib(2));
    }

    #[test]
    fn env_bad_size() {
        let mut config = CacheConfig::default();
        let err = apply_env_with(&mut config, env(&[(MAX_SIZE_ENV, "big")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSize { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixcache.toml");
        std::fs::write(&path, "[cache]\nmax_size = \"64KiB\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.max_size, ByteSize::new(65_536));
    }

    #[test]
    fn io_error_from_nonexistent_file() {
        let err = load_config(Path::new("/nonexistent/dir/pixcache.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
