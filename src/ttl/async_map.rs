//! Asynchronous TTL Facade
//!
//! [`AsyncTtlMapState`] mirrors [`TtlMapState`](super::TtlMapState) over an
//! [`AsyncMapState`]. Each operation is one store future mapped by a pure,
//! synchronous continuation; no operation issues a second store round-trip or
//! blocks the caller.
//!
//! Reads take the current time when the store future completes, writes take
//! it when the call is made.

use std::marker::PhantomData;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::config::TtlConfig;
use super::iter::Projection;
use super::paged::TtlStateIterator;
use super::value::{TimestampedValue, TtlContext};
use crate::state::{AsyncMapState, Result};

/// Paged iterator type returned by the async entries, keys and values views.
pub type AsyncEntriesIter<S, K, V, R> =
    TtlStateIterator<<S as AsyncMapState<K, TimestampedValue<V>>>::Pages, K, V, R>;

/// Asynchronous key-value state with time-to-live.
pub struct AsyncTtlMapState<S, K, V> {
    original: S,
    ctx: TtlContext,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<S, K, V> AsyncTtlMapState<S, K, V>
where
    S: AsyncMapState<K, TimestampedValue<V>>,
    K: Send + 'static,
    V: Send + 'static,
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

    /// Resolves to the live value for `key`, like
    /// [`TtlMapState::get`](super::TtlMapState::get).
    pub fn async_get(&self, key: K) -> BoxFuture<'static, Result<Option<Option<V>>>> {
        let ctx = self.ctx.clone();
        self.original
            .async_get(key)
            .map(move |wrapped| {
                let now = ctx.now();
                wrapped.map(|wrapped| ctx.check(wrapped, now))
            })
            .boxed()
    }

    /// Resolves to `true` if `key` has a live value.
    pub fn async_contains(&self, key: K) -> BoxFuture<'static, Result<bool>> {
        self.async_get(key)
            .map(|value| value.map(|value| value.is_some()))
            .boxed()
    }

    pub fn async_put(&self, key: K, value: Option<V>) -> BoxFuture<'static, Result<()>> {
        let wrapped = self.ctx.wrap(value);
        self.original.async_put(key, wrapped)
    }

    /// Writes all entries with one timestamp taken at call time.
    pub fn async_put_all<I>(&self, entries: I) -> BoxFuture<'static, Result<()>>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
    {
        let now = self.ctx.now();
        let with_ts = entries
            .into_iter()
            .map(|(key, value)| (key, TimestampedValue::new(value, now)))
            .collect();
        self.original.async_put_all(with_ts)
    }

    pub fn async_remove(&self, key: K) -> BoxFuture<'static, Result<()>> {
        self.original.async_remove(key)
    }

    /// Asks the store directly, without filtering.
    ///
    /// A store holding only expired entries reports `false` here while
    /// [`TtlMapState::is_empty`](super::TtlMapState::is_empty) reports
    /// `true`. Telling the two apart asynchronously would mean draining a
    /// possibly unbounded page source.
    pub fn async_is_empty(&self) -> BoxFuture<'static, Result<bool>> {
        self.original.async_is_empty()
    }

    /// Removes every entry, expired or not.
    pub fn async_clear(&self) -> BoxFuture<'static, Result<()>> {
        self.original.async_clear()
    }

    /// Live `(key, value)` pairs.
    pub fn async_entries(
        &self,
    ) -> BoxFuture<'static, Result<AsyncEntriesIter<S, K, V, (K, Option<V>)>>> {
        self.entries_with(|key, value| (key, value))
    }

    /// Keys of live entries.
    pub fn async_keys(&self) -> BoxFuture<'static, Result<AsyncEntriesIter<S, K, V, K>>> {
        self.entries_with(|key, _| key)
    }

    /// Values of live entries.
    pub fn async_values(&self) -> BoxFuture<'static, Result<AsyncEntriesIter<S, K, V, Option<V>>>> {
        self.entries_with(|_, value| value)
    }

    fn entries_with<R: 'static>(
        &self,
        project: Projection<K, V, R>,
    ) -> BoxFuture<'static, Result<AsyncEntriesIter<S, K, V, R>>> {
        let ctx = self.ctx.clone();
        self.original
            .async_entries()
            .map(move |pages| pages.map(|pages| TtlStateIterator::new(pages, ctx, project)))
            .boxed()
    }

    pub fn context(&self) -> &TtlContext {
        &self.ctx
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.original
    }
}
