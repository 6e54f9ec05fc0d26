//! Debug image logging handle passed into image-processing routines.

/// Debug level at which image logging starts writing files.
pub const IMAGE_LOG_LEVEL: u8 = 2;

/// Records intermediate images of an image-processing routine when debug
/// logging is turned up.
///
/// An enabled logger has side effects (files written per call) that a cached
/// result cannot reproduce, so memoized functions taking an enabled logger
/// always run uncached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLogger {
    name: String,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a logger that is enabled when `debug_level` is at least
    /// [`IMAGE_LOG_LEVEL`].
    pub fn new(name: impl Into<String>, debug_level: u8) -> Self {
        Self {
            name: name.into(),
            enabled: debug_level >= IMAGE_LOG_LEVEL,
        }
    }

    /// Creates a logger that never records anything.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }

    /// Name of the routine being logged.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this logger will perform side effects.
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}
