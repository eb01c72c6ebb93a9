//! Synchronous TTL Facade
//!
//! [`TtlMapState`] wraps any [`MapState`] storing [`TimestampedValue`]s and
//! exposes the plain key-value contract with expired entries filtered out.
//!
//! ## Thread Confinement
//!
//! The facade does no locking. Writes and iteration take `&mut self`, so one
//! instance is used from one task at a time.

use std::marker::PhantomData;

use tracing::debug;

use super::config::TtlConfig;
use super::iter::{Projection, TtlEntries};
use super::value::{TimestampedValue, TtlContext};
use crate::state::{MapState, Result};

/// Iterator type returned by the entries, keys and values views.
pub type EntriesIter<'a, S, K, V, R> =
    TtlEntries<<S as MapState<K, TimestampedValue<V>>>::Cursor<'a>, K, V, R>;

/// Synchronous key-value state with time-to-live.
///
/// # Example
///
/// ```
/// use flashttl::state::MemoryState;
/// use flashttl::ttl::{ManualClock, TtlConfig, TtlContext, TtlMapState};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(0);
/// let ctx = TtlContext::new(TtlConfig::new(Duration::from_millis(1000)), clock.clone());
/// let mut state = TtlMapState::new(MemoryState::new(), ctx);
///
/// state.put("a", Some(5)).unwrap();
/// clock.set(500);
/// assert_eq!(state.get(&"a").unwrap(), Some(Some(5)));
/// clock.set(1500);
/// assert_eq!(state.get(&"a").unwrap(), None);
/// ```
pub struct TtlMapState<S, K, V> {
    original: S,
    ctx: TtlContext,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<S, K, V> TtlMapState<S, K, V>
where
    S: MapState<K, TimestampedValue<V>>,
{
    pub fn new(original: S, ctx: TtlContext) -> Self {
        Self {
            original,
            ctx,
            _marker: PhantomData,
        }
    }

    /// Fixed TTL against the wall clock.
    pub fn with_config(original: S, config: TtlConfig) -> Self {
        Self::new(original, TtlContext::from_config(config))
    }

    /// Returns the live value for `key`.
    ///
    /// `Some(None)` is a live explicit null; `None` means no live value.
    pub fn get(&self, key: &K) -> Result<Option<Option<V>>> {
        let wrapped = self.original.get(key)?;
        Ok(self.ctx.check(wrapped, self.ctx.now()))
    }

    /// Writes `value` stamped with the current time. `None` stores an
    /// explicit null.
    pub fn put(&mut self, key: K, value: Option<V>) -> Result<()> {
        let wrapped = self.ctx.wrap(value);
        self.original.put(key, wrapped)
    }

    /// Writes all entries with one shared timestamp in a single bulk write.
    pub fn put_all<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
    {
        let now = self.ctx.now();
        let with_ts = entries
            .into_iter()
            .map(|(key, value)| (key, TimestampedValue::new(value, now)))
            .collect();
        self.original.put_all(with_ts)
    }

    pub fn remove(&mut self, key: &K) -> Result<()> {
        self.original.remove(key)
    }

    /// `true` if `key` has a live value. Expired keys report `false` even
    /// while still stored.
    pub fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// `true` if iteration would yield no live entry.
    ///
    /// This scans past every expired entry until it finds a live one, so it
    /// is O(n) in the worst case. Asking the store directly would report a
    /// store holding only expired entries as non-empty.
    pub fn is_empty(&mut self) -> Result<bool> {
        let mut entries = self.keys()?;
        let live = entries.has_next()?;
        debug!(live, skipped = entries.skipped(), "scanned state for a live entry");
        Ok(!live)
    }

    /// Removes every entry, expired or not.
    pub fn clear(&mut self) -> Result<()> {
        self.original.clear()
    }

    /// Live `(key, value)` pairs in store order.
    pub fn entries(&mut self) -> Result<EntriesIter<'_, S, K, V, (K, Option<V>)>> {
        self.entries_with(|key, value| (key, value))
    }

    /// Keys of live entries in store order.
    pub fn keys(&mut self) -> Result<EntriesIter<'_, S, K, V, K>> {
        self.entries_with(|key, _| key)
    }

    /// Values of live entries in store order.
    pub fn values(&mut self) -> Result<EntriesIter<'_, S, K, V, Option<V>>> {
        self.entries_with(|_, value| value)
    }

    /// Same as [`entries`](Self::entries).
    pub fn iter(&mut self) -> Result<EntriesIter<'_, S, K, V, (K, Option<V>)>> {
        self.entries()
    }

    fn entries_with<R>(&mut self, project: Projection<K, V, R>) -> Result<EntriesIter<'_, S, K, V, R>> {
        let cursor = self.original.entries()?;
        Ok(TtlEntries::new(cursor, self.ctx.clone(), project))
    }

    pub fn context(&self) -> &TtlContext {
        &self.ctx
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.original
    }

    pub fn into_inner(self) -> S {
        self.original
    }
}
