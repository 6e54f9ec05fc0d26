//! Scoped ownership of the process's single open store.
//!
//! A [`CacheScope`] opens the store on entry and closes it when dropped.
//! Memoizers borrow its [`CacheHandle`] per call; with no handle (no scope,
//! or caching disabled) they run the wrapped function directly.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pixcache_common::ByteSize;
use pixcache_config::{apply_env, resolve_store_path, CacheConfig, DISABLE_ENV};
use serde::de::DeserializeOwned;

use crate::error::CacheError;
use crate::store::{PutOutcome, Store};

/// Set while a scope holds an open store.
static SCOPE_OPEN: AtomicBool = AtomicBool::new(false);

/// Set once the first capacity warning has been logged.
static FULL_WARNED: AtomicBool = AtomicBool::new(false);

/// Returns `true` if the disable switch is set in the environment.
pub fn caching_disabled_by_env() -> bool {
    std::env::var_os(DISABLE_ENV).is_some_and(|v| !v.is_empty())
}

/// Returns `true` if a scope currently holds the store open.
pub fn scope_is_open() -> bool {
    SCOPE_OPEN.load(Ordering::SeqCst)
}

/// Proof of holding the process-wide scope slot.
#[derive(Debug)]
struct ScopeClaim(());

impl ScopeClaim {
    fn acquire() -> Self {
        assert!(
            !SCOPE_OPEN.swap(true, Ordering::SeqCst),
            "a cache scope is already open in this process"
        );
        ScopeClaim(())
    }
}

impl Drop for ScopeClaim {
    fn drop(&mut self) {
        SCOPE_OPEN.store(false, Ordering::SeqCst);
    }
}

/// The open store, as seen by memoizers.
///
/// Write failures are absorbed here: the write is dropped and counted, and a
/// full store is warned about the first time it happens in the process.
#[derive(Debug)]
pub struct CacheHandle {
    store: Store,
    full: AtomicBool,
    dropped_writes: AtomicU64,
}

impl CacheHandle {
    fn new(store: Store) -> Self {
        Self {
            store,
            full: AtomicBool::new(false),
            dropped_writes: AtomicU64::new(0),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Directory holding the store files.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Number of writes discarded because the store was full or failed.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }

    /// Returns `true` once a write has been refused for lack of space.
    pub fn is_full(&self) -> bool {
        self.full.load(Ordering::Relaxed)
    }

    /// Reads and decodes the entry under `key`.
    ///
    /// An entry that does not decode as `T` is a [`CacheError::CorruptEntry`]
    /// labelled with `describe()`.
    pub(crate) fn fetch<T: DeserializeOwned>(
        &self,
        key: &[u8],
        describe: impl FnOnce() -> String,
    ) -> Result<Option<T>, CacheError> {
        match self.store.read(key, |bytes| serde_json::from_slice::<T>(bytes))? {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => Err(CacheError::CorruptEntry {
                key: describe(),
                reason: e.to_string(),
            }),
        }
    }

    /// Stores `value` under `key`, returning `true` if the entry was written.
    ///
    /// Write failures never reach the caller: a full store is counted and
    /// warned about once per process, any other store error is logged. Either
    /// way the entry is missing afterwards.
    pub(crate) fn put(&self, key: &[u8], value: &[u8]) -> bool {
        match self.store.put(key, value) {
            Ok(PutOutcome::Stored) => true,
            Ok(PutOutcome::CapacityExceeded) => {
                self.full.store(true, Ordering::Relaxed);
                self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                if !FULL_WARNED.swap(true, Ordering::SeqCst) {
                    log::warn!(
                        "cache store at {} is full ({}); results are no longer being cached. \
                         Delete it or run `pixcache purge` to start over.",
                        self.path().display(),
                        self.store.max_size()
                    );
                }
                false
            }
            Err(e) => {
                self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "cache store at {}: write failed, result not cached: {e}",
                    self.path().display()
                );
                false
            }
        }
    }
}

/// An explicit region during which the store is open.
///
/// At most one scope with an open store may exist per process; opening a
/// second one panics. A disabled scope holds no handle and does not count.
///
/// ```no_run
/// use pixcache_config::CacheConfig;
/// use pixcache_memo::CacheScope;
///
/// let scope = CacheScope::open(&CacheConfig::default())?;
/// if let Some(handle) = scope.handle() {
///     println!("caching into {}", handle.path().display());
/// }
/// # Ok::<(), pixcache_memo::CacheError>(())
/// ```
#[derive(Debug)]
pub struct CacheScope {
    handle: Option<CacheHandle>,
    // Dropped after the handle is closed.
    claim: Option<ScopeClaim>,
}

impl CacheScope {
    /// Opens the store described by `config`.
    ///
    /// Returns a disabled scope if `config.disabled` is set or the disable
    /// switch is present in the environment.
    pub fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        if config.disabled || caching_disabled_by_env() {
            log::debug!("caching disabled; memoized calls run directly");
            return Ok(Self::disabled());
        }
        let path = resolve_store_path(config)?;
        Self::open_at(&path, config.max_size)
    }

    /// Opens the store at an explicit path.
    ///
    /// The environment disable switch still applies.
    pub fn open_at(path: &Path, max_size: ByteSize) -> Result<Self, CacheError> {
        if caching_disabled_by_env() {
            log::debug!("{DISABLE_ENV} is set; memoized calls run directly");
            return Ok(Self::disabled());
        }
        let claim = ScopeClaim::acquire();
        let store = Store::open(path, max_size)?;
        log::debug!("cache scope opened at {}", path.display());
        Ok(Self {
            handle: Some(CacheHandle::new(store)),
            claim: Some(claim),
        })
    }

    /// Opens the store configured purely by environment variables.
    pub fn from_env() -> Result<Self, CacheError> {
        let mut config = CacheConfig::default();
        apply_env(&mut config)?;
        Self::open(&config)
    }

    /// A scope with no store.
    pub fn disabled() -> Self {
        Self {
            handle: None,
            claim: None,
        }
    }

    /// The open handle, or `None` if caching is off.
    pub fn handle(&self) -> Option<&CacheHandle> {
        self.handle.as_ref()
    }

    /// Returns `true` if this scope holds an open store.
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Closes the store now instead of at drop.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let dropped = handle.dropped_writes();
            if dropped > 0 {
                log::debug!("{dropped} writes were dropped because the store was full");
            }
            handle.store.close();
            log::debug!("cache scope closed");
        }
        self.claim.take();
    }
}

impl Drop for CacheScope {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, PoisonError};
    use tempfile::TempDir;

    static SCOPE_LOCK: Mutex<()> = Mutex::new(());

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        SCOPE_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn disabled_scope_has_no_handle() {
        let _guard = lock();
        let scope = CacheScope::open(&CacheConfig::disabled()).unwrap();
        assert!(!scope.is_active());
        assert!(scope.handle().is_none());
        assert!(!scope_is_open());
    }

    #[test]
    fn scope_claims_and_releases_slot() {
        let _guard = lock();
        let dir = TempDir::new().unwrap();
        let scope = CacheScope::open(&CacheConfig::at(dir.path().join("cache.lmdb"))).unwrap();
        assert!(scope.is_active());
        assert!(scope_is_open());
        scope.close();
        assert!(!scope_is_open());
    }

    #[test]
    fn reopen_after_close() {
        let _guard = lock();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.lmdb");
        {
            let scope = CacheScope::open_at(&path, ByteSize::mib(4)).unwrap();
            let handle = scope.handle().unwrap();
            assert!(handle.put(b"k", b"[1,2]"));
        }
        let scope = CacheScope::open_at(&path, ByteSize::mib(4)).unwrap();
        let value: Option<Vec<u8>> = scope.handle().unwrap().fetch(b"k", String::new).unwrap();
        assert_eq!(value, Some(vec![1, 2]));
    }

    #[test]
    fn undecodable_entry_is_corrupt() {
        let _guard = lock();
        let dir = TempDir::new().unwrap();
        let scope = CacheScope::open_at(&dir.path().join("cache.lmdb"), ByteSize::mib(4)).unwrap();
        let handle = scope.handle().unwrap();
        assert!(handle.put(b"k", b"not json"));
        let err = handle
            .fetch::<u32>(b"k", || "6b".to_string())
            .unwrap_err();
        assert!(matches!(err, CacheError::CorruptEntry { ref key, .. } if key == "6b"));
    }

    #[test]
    fn failed_write_is_absorbed() {
        let _guard = lock();
        let dir = TempDir::new().unwrap();
        let scope = CacheScope::open_at(&dir.path().join("cache.lmdb"), ByteSize::mib(4)).unwrap();
        let handle = scope.handle().unwrap();
        // LMDB rejects keys longer than 511 bytes.
        assert!(!handle.put(&[1u8; 600], b"1"));
        assert_eq!(handle.dropped_writes(), 1);
        assert!(!handle.is_full());
        assert!(handle.put(b"k", b"1"));
        assert_eq!(handle.store().len().unwrap(), 1);
    }

    #[test]
    fn failed_open_releases_slot() {
        let _guard = lock();
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let err = CacheScope::open_at(&blocker.join("cache.lmdb"), ByteSize::mib(1)).unwrap_err();
        assert!(matches!(err, CacheError::StoreUnavailable { .. }));
        assert!(!scope_is_open());
    }

    #[test]
    #[should_panic(expected = "already open")]
    fn nested_scope_panics() {
        let _guard = lock();
        let dir = TempDir::new().unwrap();
        let _outer = CacheScope::open_at(&dir.path().join("a"), ByteSize::mib(1)).unwrap();
        let _inner = CacheScope::open_at(&dir.path().join("b"), ByteSize::mib(1));
    }
}
