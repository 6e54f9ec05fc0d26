//! Persistent memoization of expensive image-processing calls.
//!
//! A function is made cacheable by describing it with [`Memoize`] (its name
//! and static fields such as an algorithm version) and passing its resolved
//! arguments as [`CallArgs`]. While a [`CacheScope`] holds the store open,
//! results are keyed by an XXH3-128 hash of the canonical arguments and
//! stored as JSON in a size-bounded LMDB environment. Pixel buffers enter
//! the key only as their shape and content hash.
//!
//! Without an open scope every call runs directly, and so does any call
//! whose arguments cannot be keyed (see [`NotCachable`]). A full store
//! stops caching but never fails a call.

#![warn(missing_docs)]

pub mod canonical;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod memoize;
pub mod sequence;
pub mod store;

pub use canonical::{canonical_bytes, ArgValue, CacheArg, CallArgs, NotCachable};
pub use error::CacheError;
pub use key::{CacheKey, KeyHasher};
pub use lifecycle::{CacheHandle, CacheScope};
pub use memoize::Memoize;
pub use sequence::MemoizeIter;
pub use store::{PutOutcome, Store, StoreStats};
