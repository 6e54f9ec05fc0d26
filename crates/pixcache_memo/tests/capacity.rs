//! Behaviour of a store that runs out of space.
//!
//! This file holds a single test: it installs a process-wide logger to
//! count capacity warnings.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};
use pixcache_common::ByteSize;
use pixcache_memo::{call_args, CacheScope, Memoize};
use serde_json::json;
use tempfile::TempDir;

struct CountingLogger {
    warnings: AtomicUsize,
}

impl Log for CountingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flush(&self) {}
}

static LOGGER: CountingLogger = CountingLogger {
    warnings: AtomicUsize::new(0),
};

#[test]
fn full_store_degrades_to_uncached_calls() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Warn);

    let dir = TempDir::new().unwrap();
    let scope = CacheScope::open_at(&dir.path().join("cache.lmdb"), ByteSize::mib(1)).unwrap();
    let handle = scope.handle().unwrap();
    let memo = Memoize::new("render", json!(null));
    let calls = AtomicUsize::new(0);

    let render = |i: u32| {
        memo.call(Some(handle), &call_args!(i), || {
            calls.fetch_add(1, Ordering::SeqCst);
            format!("{i:>6}").repeat(16 * 1024)
        })
        .unwrap()
    };

    for i in 0..40 {
        let text = render(i);
        assert_eq!(text.len(), 6 * 16 * 1024);
        assert!(text.starts_with(&format!("{i:>6}")));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 40);
    assert!(handle.is_full());
    assert!(handle.dropped_writes() > 1);
    assert_eq!(LOGGER.warnings.load(Ordering::SeqCst), 1);

    // Whatever made it in before the store filled up is still served.
    let stored = handle.store().len().unwrap();
    assert!(stored > 0);
    assert_eq!(stored + handle.dropped_writes(), 40);
    render(0);
    assert_eq!(calls.load(Ordering::SeqCst), 40);

    // Later overflows stay quiet.
    for i in 100..110 {
        render(i);
    }
    assert_eq!(LOGGER.warnings.load(Ordering::SeqCst), 1);
}
