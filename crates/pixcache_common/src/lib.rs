//! Shared value types for the pixcache memoization engine.
//!
//! This crate provides content hashing, shaped pixel buffers, loose version
//! strings, template-matching parameters, the debug image logger handle, and
//! byte-size values.

#![warn(missing_docs)]

pub mod debug_log;
pub mod frame;
pub mod hash;
pub mod match_params;
pub mod size;
pub mod version;

pub use debug_log::DebugLogger;
pub use frame::{BufferView, Frame, ShapeError};
pub use hash::{ContentHash, ContentHasher};
pub use match_params::{ConfirmMethod, MatchMethod, MatchParameters};
pub use size::{ByteSize, ParseSizeError};
pub use version::{LooseVersion, VersionPart};
