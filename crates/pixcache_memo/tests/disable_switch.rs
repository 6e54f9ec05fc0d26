//! The environment switches read when a scope opens.
//!
//! Environment variables are process-global, so everything runs in one test.

use std::sync::atomic::{AtomicUsize, Ordering};

use pixcache_common::ByteSize;
use pixcache_config::{CacheConfig, DISABLE_ENV, MAX_SIZE_ENV, PATH_ENV};
use pixcache_memo::{call_args, CacheScope, Memoize};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn environment_controls_scopes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.lmdb");
    let memo = Memoize::new("ocr", json!(null));
    let calls = AtomicUsize::new(0);
    let lang = "deu";

    // Disabled: explicit paths and configs are both overridden.
    std::env::set_var(DISABLE_ENV, "1");
    let scope = CacheScope::open_at(&path, ByteSize::mib(4)).unwrap();
    assert!(!scope.is_active());
    let scope_from_config = CacheScope::open(&CacheConfig::at(&path)).unwrap();
    assert!(!scope_from_config.is_active());
    for _ in 0..2 {
        memo.call(scope.handle(), &call_args!(lang), || {
            calls.fetch_add(1, Ordering::SeqCst);
            "text".to_string()
        })
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!path.exists());
    drop(scope);
    drop(scope_from_config);

    // An empty value does not disable.
    std::env::set_var(DISABLE_ENV, "");
    let scope = CacheScope::open_at(&path, ByteSize::mib(4)).unwrap();
    assert!(scope.is_active());
    scope.close();
    std::env::remove_var(DISABLE_ENV);

    // Path and size from the environment.
    let env_path = dir.path().join("from-env");
    std::env::set_var(PATH_ENV, &env_path);
    std::env::set_var(MAX_SIZE_ENV, "2MiB");
    let scope = CacheScope::from_env().unwrap();
    let handle = scope.handle().unwrap();
    assert_eq!(handle.path(), env_path.as_path());
    assert_eq!(handle.store().max_size(), ByteSize::mib(2));
    for _ in 0..2 {
        memo.call(scope.handle(), &call_args!(lang), || {
            calls.fetch_add(1, Ordering::SeqCst);
            "text".to_string()
        })
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    scope.close();

    std::env::set_var(MAX_SIZE_ENV, "lots");
    assert!(CacheScope::from_env().is_err());

    std::env::remove_var(PATH_ENV);
    std::env::remove_var(MAX_SIZE_ENV);
}
