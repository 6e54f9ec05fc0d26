//! Loading and resolution of the pixcache store configuration.
//!
//! Settings come from an optional `pixcache.toml` file, overlaid with
//! environment variables, and resolve to a [`CacheConfig`] plus a concrete
//! store path.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{apply_env, apply_env_with, load_config, load_config_from_str};
pub use resolve::{resolve_store_path, resolve_store_path_in};
pub use types::*;
