//! Cache keys and the streaming hasher that produces them.

use std::fmt;

use pixcache_common::{ContentHash, ContentHasher};

/// Fixed-width digest identifying one memoized call.
///
/// Two calls are cache-equivalent iff their keys are equal. Scalar results
/// are stored under the key bytes; sequence elements under the key bytes
/// followed by the decimal element index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(ContentHash);

impl CacheKey {
    /// The raw digest bytes, used verbatim as the store key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The store key of element `index` of a memoized sequence.
    pub fn indexed(&self, index: usize) -> Vec<u8> {
        let suffix = index.to_string();
        let mut key = Vec::with_capacity(16 + suffix.len());
        key.extend_from_slice(self.as_bytes());
        key.extend_from_slice(suffix.as_bytes());
        key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.0)
    }
}

/// Streams canonical bytes through XXH3-128.
///
/// Cloning a hasher forks its state, so a per-function prefix can be hashed
/// once and reused for every call.
#[derive(Clone, Debug, Default)]
pub struct KeyHasher {
    inner: ContentHasher,
}

impl KeyHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes into the key.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Returns the key of everything fed so far.
    pub fn finish(&self) -> CacheKey {
        CacheKey(self.inner.finish())
    }
}
