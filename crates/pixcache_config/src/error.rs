//! Error types for configuration loading and validation.

/// Errors that can occur when loading or resolving a cache configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A size value could not be parsed.
    #[error("invalid size in {field}: {reason}")]
    InvalidSize {
        /// The configuration key holding the size.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// No store path was configured and no user cache directory exists.
    #[error("no cache directory: set cache.path or {0}")]
    NoCacheHome(&'static str),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
