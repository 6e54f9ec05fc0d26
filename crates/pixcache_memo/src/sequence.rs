//! Memoization of lazily produced sequences.
//!
//! Element `i` of a memoized sequence is stored under `key ++ "i"` as
//! `[element, null]`. A finite sequence that ran to completion also stores
//! `[null, "exhausted"]` at the index one past its last element.
//!
//! A pass first replays stored elements in order. At the first missing
//! index it starts the underlying computation from scratch, discards the
//! elements the replay already yielded, and stores each new element as it
//! is pulled. The consumer sees the same sequence either way.

use std::iter::FusedIterator;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;
use crate::key::CacheKey;
use crate::lifecycle::CacheHandle;

/// End reason recorded when the underlying iterator is exhausted.
pub const END_EXHAUSTED: &str = "exhausted";

enum Entry<T> {
    Item(T),
    End,
}

enum SeqState<It> {
    /// Serving stored elements; `index` is the next one to look up.
    Replay { index: usize },
    /// Pulling from the underlying iterator.
    Fresh { inner: It, index: usize, skip: usize },
    Done,
}

/// Iterator returned by [`Memoize::iter`](crate::Memoize::iter).
///
/// Yields `Err` once and then ends if reading the store fails or it holds an
/// entry that does not decode. A failed write only stops caching for the
/// rest of the pass.
pub struct MemoizeIter<'h, I: IntoIterator, F> {
    name: Arc<str>,
    cache: Option<(&'h CacheHandle, CacheKey)>,
    make: Option<F>,
    state: SeqState<I::IntoIter>,
}

impl<'h, I, F> MemoizeIter<'h, I, F>
where
    I: IntoIterator,
    I::Item: Serialize + DeserializeOwned,
    F: FnOnce() -> I,
{
    pub(crate) fn new(name: Arc<str>, cache: Option<(&'h CacheHandle, CacheKey)>, make: F) -> Self {
        Self {
            name,
            cache,
            make: Some(make),
            state: SeqState::Replay { index: 0 },
        }
    }

    /// Returns `true` while elements are still being served from the store.
    pub fn is_replaying(&self) -> bool {
        matches!(self.state, SeqState::Replay { .. }) && self.cache.is_some()
    }
}

impl<I, F> Iterator for MemoizeIter<'_, I, F>
where
    I: IntoIterator,
    I::Item: Serialize + DeserializeOwned,
    F: FnOnce() -> I,
{
    type Item = Result<I::Item, CacheError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                SeqState::Done => return None,

                SeqState::Replay { index } => {
                    let index = *index;
                    if let Some((handle, key)) = self.cache {
                        match read_entry(handle, &key, index) {
                            Ok(Some(Entry::Item(value))) => {
                                self.state = SeqState::Replay { index: index + 1 };
                                return Some(Ok(value));
                            }
                            Ok(Some(Entry::End)) => {
                                log::debug!("{}: replayed {index} elements to the end", self.name);
                                self.state = SeqState::Done;
                                return None;
                            }
                            Ok(None) => {}
                            Err(e) => {
                                self.state = SeqState::Done;
                                return Some(Err(e));
                            }
                        }
                    }

                    let Some(make) = self.make.take() else {
                        self.state = SeqState::Done;
                        return None;
                    };
                    if index > 0 {
                        log::debug!("{}: resuming after {index} cached elements", self.name);
                    }
                    self.state = SeqState::Fresh {
                        inner: make().into_iter(),
                        index: 0,
                        skip: index,
                    };
                }

                SeqState::Fresh { inner, index, skip } => match inner.next() {
                    Some(value) => {
                        let i = *index;
                        *index += 1;
                        if i < *skip {
                            continue;
                        }
                        if let Some((handle, key)) = self.cache {
                            match encode_item(&value) {
                                // Nothing may be stored past a missing index.
                                Some(bytes) => {
                                    if !handle.put(&key.indexed(i), &bytes) {
                                        log::debug!(
                                            "{}: element {i} was not stored, caching stopped",
                                            self.name
                                        );
                                        self.cache = None;
                                    }
                                }
                                None => {
                                    log::debug!(
                                        "{}: element {i} does not round-trip, caching stopped",
                                        self.name
                                    );
                                    self.cache = None;
                                }
                            }
                        }
                        return Some(Ok(value));
                    }
                    None => {
                        let (end, skip) = (*index, *skip);
                        self.state = SeqState::Done;
                        // A run shorter than the replayed prefix leaves the
                        // stored elements untouched.
                        if let Some((handle, key)) = self.cache.filter(|_| end >= skip) {
                            write_end(handle, &key, end);
                        }
                        return None;
                    }
                },
            }
        }
    }
}

impl<I, F> FusedIterator for MemoizeIter<'_, I, F>
where
    I: IntoIterator,
    I::Item: Serialize + DeserializeOwned,
    F: FnOnce() -> I,
{
}

impl<I: IntoIterator, F> std::fmt::Debug for MemoizeIter<'_, I, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            SeqState::Replay { index } => format!("replay@{index}"),
            SeqState::Fresh { index, skip, .. } => format!("fresh@{index} skip {skip}"),
            SeqState::Done => "done".to_string(),
        };
        f.debug_struct("MemoizeIter")
            .field("name", &self.name)
            .field("cached", &self.cache.is_some())
            .field("state", &state)
            .finish()
    }
}

fn read_entry<T: DeserializeOwned>(
    handle: &CacheHandle,
    key: &CacheKey,
    index: usize,
) -> Result<Option<Entry<T>>, CacheError> {
    let describe = || format!("{key}/{index}");
    let Some((value, end)) =
        handle.fetch::<(serde_json::Value, Option<String>)>(&key.indexed(index), describe)?
    else {
        return Ok(None);
    };
    if end.is_some() {
        return Ok(Some(Entry::End));
    }
    serde_json::from_value(value)
        .map(|v| Some(Entry::Item(v)))
        .map_err(|e| CacheError::CorruptEntry {
            key: describe(),
            reason: e.to_string(),
        })
}

/// Encodes an element entry, returning `None` unless it decodes back.
fn encode_item<T: Serialize + DeserializeOwned>(value: &T) -> Option<Vec<u8>> {
    let bytes = serde_json::to_vec(&(value, None::<&str>)).ok()?;
    serde_json::from_slice::<(T, Option<String>)>(&bytes).ok()?;
    Some(bytes)
}

fn write_end(handle: &CacheHandle, key: &CacheKey, index: usize) {
    if let Ok(bytes) = serde_json::to_vec(&(None::<()>, END_EXHAUSTED)) {
        handle.put(&key.indexed(index), &bytes);
    }
}
