//! Memoization of individual calls.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::canonical::{write_args, write_prefix, CallArgs, NotCachable};
use crate::error::CacheError;
use crate::key::{CacheKey, KeyHasher};
use crate::lifecycle::CacheHandle;
use crate::sequence::MemoizeIter;

/// A cacheable function: its name plus static fields that distinguish
/// cache epochs, such as an algorithm version.
///
/// The canonical prefix `[name, fields,` is hashed once at construction;
/// each call only streams its arguments.
///
/// ```
/// use pixcache_memo::{call_args, Memoize};
/// use serde_json::json;
///
/// let ocr = Memoize::new("ocr", json!({"version": 30}));
/// let lang = "eng";
/// let text = ocr.call(None, &call_args!(lang), || "hello".to_string())?;
/// assert_eq!(text, "hello");
/// # Ok::<(), pixcache_memo::CacheError>(())
/// ```
#[derive(Clone)]
pub struct Memoize {
    name: Arc<str>,
    fields: serde_json::Value,
    prefix: Result<KeyHasher, NotCachable>,
}

impl Memoize {
    /// Describes the function `name` with the given static fields.
    pub fn new(name: impl Into<Arc<str>>, fields: serde_json::Value) -> Self {
        let name = name.into();
        let mut hasher = KeyHasher::new();
        let prefix = write_prefix(&mut hasher, &name, &fields).map(|()| hasher);
        Self {
            name,
            fields,
            prefix,
        }
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The static fields.
    pub fn fields(&self) -> &serde_json::Value {
        &self.fields
    }

    /// Computes the key of a call with `args`.
    pub fn key(&self, args: &CallArgs<'_>) -> Result<CacheKey, NotCachable> {
        let mut hasher = self.prefix.clone()?;
        write_args(&mut hasher, args)?;
        Ok(hasher.finish())
    }

    /// Returns the cached result of this call, or runs `f` and caches what it
    /// returns.
    ///
    /// With no handle, or arguments that cannot be keyed, `f` runs directly.
    pub fn call<T, F>(
        &self,
        handle: Option<&CacheHandle>,
        args: &CallArgs<'_>,
        f: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.try_call(handle, args, || Ok::<T, CacheError>(f()))
    }

    /// Like [`call`](Self::call) for fallible functions.
    ///
    /// An `Err` from `f` is returned as is and never cached.
    pub fn try_call<T, E, F>(
        &self,
        handle: Option<&CacheHandle>,
        args: &CallArgs<'_>,
        f: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let Some(handle) = handle else {
            return f();
        };
        let key = match self.key(args) {
            Ok(key) => key,
            Err(reason) => {
                log::debug!("{}: not cachable: {reason}", self.name);
                return f();
            }
        };

        if let Some(value) = handle.fetch::<T>(key.as_bytes(), || key.to_string())? {
            log::debug!("{}: hit {key}", self.name);
            return Ok(value);
        }
        log::debug!("{}: miss {key}", self.name);

        let value = f()?;
        match encode_checked(&value) {
            Some(bytes) => {
                handle.put(key.as_bytes(), &bytes);
            }
            None => log::debug!("{}: result does not round-trip, not stored", self.name),
        }
        Ok(value)
    }

    /// Memoizes a lazily produced sequence element by element.
    ///
    /// `make` is only called if the cached prefix runs out before the
    /// consumer stops pulling.
    pub fn iter<'h, I, F>(
        &self,
        handle: Option<&'h CacheHandle>,
        args: &CallArgs<'_>,
        make: F,
    ) -> MemoizeIter<'h, I, F>
    where
        I: IntoIterator,
        I::Item: Serialize + DeserializeOwned,
        F: FnOnce() -> I,
    {
        let cache = match handle.map(|h| (h, self.key(args))) {
            Some((h, Ok(key))) => Some((h, key)),
            Some((_, Err(reason))) => {
                log::debug!("{}: not cachable: {reason}", self.name);
                None
            }
            None => None,
        };
        MemoizeIter::new(self.name.clone(), cache, make)
    }
}

impl fmt::Debug for Memoize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoize")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Encodes `value`, returning `None` unless the encoding decodes back as `T`.
///
/// JSON has no form for some values (non-finite floats encode as `null`), so
/// storing them would turn a later hit into a corrupt entry.
pub(crate) fn encode_checked<T>(value: &T) -> Option<Vec<u8>>
where
    T: Serialize + DeserializeOwned,
{
    let bytes = serde_json::to_vec(value).ok()?;
    serde_json::from_slice::<T>(&bytes).ok()?;
    Some(bytes)
}
