//! Size-bounded persistent key-value store backed by LMDB.
//!
//! The store is a single unnamed LMDB database of raw byte keys and values.
//! Its size limit is the LMDB map size: once the map is full, writes are
//! refused with [`PutOutcome::CapacityExceeded`] and nothing is evicted.

use std::fmt;
use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use pixcache_common::ByteSize;

use crate::error::CacheError;

/// Map sizes are rounded up to this granularity, a multiple of every
/// common OS page size.
const MAP_GRANULARITY: u64 = 64 * 1024;

/// Result of a write that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The value was committed.
    Stored,
    /// The store is full; the write was discarded.
    CapacityExceeded,
}

/// A snapshot of store usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored entries.
    pub entries: u64,
    /// Configured maximum size.
    pub max_size: ByteSize,
    /// Size of the data file on disk.
    pub disk_size: ByteSize,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} of {} used",
            self.entries, self.disk_size, self.max_size
        )
    }
}

/// An open LMDB environment holding memoized results.
pub struct Store {
    env: Env,
    db: Database<Bytes, Bytes>,
    path: PathBuf,
    max_size: ByteSize,
}

impl Store {
    /// Opens the store at `path`, creating the directory and database if
    /// they do not exist.
    pub fn open(path: &Path, max_size: ByteSize) -> Result<Self, CacheError> {
        let unavailable = |reason: String| CacheError::StoreUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        std::fs::create_dir_all(path).map_err(|e| unavailable(e.to_string()))?;

        let map_size = map_size_for(max_size).ok_or_else(|| {
            unavailable(format!("size {max_size} exceeds the address space"))
        })?;

        // SAFETY: the environment is opened once per process at a time and
        // the data file is never truncated or modified outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path)
        }
        .map_err(|e| unavailable(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(|e| unavailable(e.to_string()))?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| unavailable(e.to_string()))?;
        wtxn.commit().map_err(|e| unavailable(e.to_string()))?;

        log::debug!("opened cache store at {} ({max_size})", path.display());

        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
            max_size,
        })
    }

    /// Directory holding the LMDB files.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured maximum size.
    pub fn max_size(&self) -> ByteSize {
        self.max_size
    }

    /// Looks up `key` and passes the stored bytes to `decode`.
    ///
    /// The bytes borrow the read transaction, so they are only available
    /// inside `decode`.
    pub fn read<T>(
        &self,
        key: &[u8],
        decode: impl FnOnce(&[u8]) -> T,
    ) -> Result<Option<T>, CacheError> {
        let rtxn = self.env.read_txn()?;
        let value = self.db.get(&rtxn, key)?.map(decode);
        Ok(value)
    }

    /// Returns `true` if `key` has a stored value.
    pub fn contains(&self, key: &[u8]) -> Result<bool, CacheError> {
        Ok(self.read(key, |_| ())?.is_some())
    }

    /// Writes `value` under `key` in its own transaction.
    ///
    /// A full map is reported as [`PutOutcome::CapacityExceeded`]; any other
    /// LMDB failure is an error.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<PutOutcome, CacheError> {
        let mut wtxn = self.env.write_txn()?;
        match self.db.put(&mut wtxn, key, value) {
            Ok(()) => {}
            Err(e) if is_map_full(&e) => return Ok(PutOutcome::CapacityExceeded),
            Err(e) => return Err(e.into()),
        }
        match wtxn.commit() {
            Ok(()) => Ok(PutOutcome::Stored),
            Err(e) if is_map_full(&e) => Ok(PutOutcome::CapacityExceeded),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<u64, CacheError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.len(&rtxn)?)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Deletes every entry, returning how many were removed.
    pub fn clear(&self) -> Result<u64, CacheError> {
        let mut wtxn = self.env.write_txn()?;
        let removed = self.db.len(&wtxn)?;
        self.db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(removed)
    }

    /// Reports current usage.
    pub fn stats(&self) -> Result<StoreStats, CacheError> {
        Ok(StoreStats {
            entries: self.len()?,
            max_size: self.max_size,
            disk_size: ByteSize::new(self.env.real_disk_size()?),
        })
    }

    /// Flushes and closes the environment.
    ///
    /// Blocks until LMDB has released the files, so the same path can be
    /// reopened immediately afterwards.
    pub fn close(self) {
        let Self { env, path, .. } = self;
        env.prepare_for_closing().wait();
        log::debug!("closed cache store at {}", path.display());
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

fn is_map_full(e: &heed::Error) -> bool {
    matches!(e, heed::Error::Mdb(heed::MdbError::MapFull))
}

fn map_size_for(max_size: ByteSize) -> Option<usize> {
    let bytes = max_size.bytes().max(MAP_GRANULARITY);
    let rounded = bytes.checked_add(MAP_GRANULARITY - 1)? / MAP_GRANULARITY * MAP_GRANULARITY;
    usize::try_from(rounded).ok()
}
