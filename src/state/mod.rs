//! State Store Module
//!
//! This module defines the contract of the key-value state store that the TTL
//! layer sits on top of, plus a reference in-memory implementation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────────┐
//! │  MapState (sync)         │      │  AsyncMapState (async)       │
//! │  get/put/remove/...      │      │  async_get/async_put/...     │
//! │  entries() -> Cursor     │      │  async_entries() -> Pages    │
//! └────────────┬─────────────┘      └──────────────┬───────────────┘
//!              │                                   │
//!              ▼                                   ▼
//!      ┌───────────────┐                  ┌─────────────────┐
//!      │  StateCursor  │                  │   EntryPages    │
//!      │ advance()     │                  │ next_page()     │
//!      │ remove_current│                  │ (one pass)      │
//!      └───────────────┘                  └─────────────────┘
//! ```
//!
//! The store knows nothing about expiration. It stores whatever value type it
//! is given, which for the TTL layer is a [`TimestampedValue`](crate::ttl::TimestampedValue).
//!
//! ## Errors
//!
//! Every store operation returns [`Result`]. The TTL layer forwards store
//! failures unchanged with `?` and adds only the two iterator errors.

pub mod memory;

use futures::future::BoxFuture;
use thiserror::Error;

pub use memory::{MemoryCursor, MemoryPages, MemoryState, StateStats, DEFAULT_PAGE_SIZE};

/// Errors produced by the state layer and its iterators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// `next_item()` was called after the last live entry was consumed.
    #[error("no more live entries in this iteration")]
    EndOfSequence,

    /// `remove_current()` was called outside the window right after a
    /// successful `next_item()`.
    #[error("remove_current() is only allowed right after next_item(), before any further has_next() or next_item()")]
    InvalidIteratorState,

    /// The underlying store failed.
    #[error("state backend error: {0}")]
    Backend(String),

    /// A caller-supplied iteration callback failed.
    #[error("iteration callback failed: {0}")]
    Callback(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, StateError>;

/// A forward-only cursor over the raw entries of a [`MapState`].
pub trait StateCursor<K, V> {
    /// Moves to the next stored entry and returns a copy of it.
    ///
    /// Returns `Ok(None)` once the cursor is exhausted.
    fn advance(&mut self) -> Result<Option<(K, V)>>;

    /// Removes the entry most recently returned by [`advance`](Self::advance)
    /// from the store.
    fn remove_current(&mut self) -> Result<()>;
}

/// Synchronous key-value state, confined to one thread per instance.
pub trait MapState<K, V> {
    /// Cursor returned by [`entries`](Self::entries).
    type Cursor<'a>: StateCursor<K, V>
    where
        Self: 'a;

    fn get(&self, key: &K) -> Result<Option<V>>;

    fn put(&mut self, key: K, value: V) -> Result<()>;

    /// Writes all entries in one bulk operation.
    fn put_all(&mut self, entries: Vec<(K, V)>) -> Result<()>;

    fn remove(&mut self, key: &K) -> Result<()>;

    fn contains(&self, key: &K) -> Result<bool>;

    fn is_empty(&self) -> Result<bool>;

    fn clear(&mut self) -> Result<()>;

    /// Returns a fresh cursor positioned before the first entry.
    ///
    /// Each call starts a new pass.
    fn entries(&mut self) -> Result<Self::Cursor<'_>>;
}

/// A one-pass, possibly paged source of entries for asynchronous iteration.
pub trait EntryPages<K, V>: Send {
    /// Fetches the next page. `Ok(None)` means the source is drained.
    fn next_page(&mut self) -> BoxFuture<'_, Result<Option<Vec<(K, V)>>>>;
}

/// Asynchronous key-value state.
///
/// Every operation returns a `'static` future, so callers can compose or
/// spawn it without holding a borrow of the store.
pub trait AsyncMapState<K, V> {
    /// Page source returned by [`async_entries`](Self::async_entries).
    type Pages: EntryPages<K, V> + 'static;

    fn async_get(&self, key: K) -> BoxFuture<'static, Result<Option<V>>>;

    fn async_put(&self, key: K, value: V) -> BoxFuture<'static, Result<()>>;

    fn async_put_all(&self, entries: Vec<(K, V)>) -> BoxFuture<'static, Result<()>>;

    fn async_remove(&self, key: K) -> BoxFuture<'static, Result<()>>;

    fn async_contains(&self, key: K) -> BoxFuture<'static, Result<bool>>;

    fn async_is_empty(&self) -> BoxFuture<'static, Result<bool>>;

    fn async_clear(&self) -> BoxFuture<'static, Result<()>>;

    fn async_entries(&self) -> BoxFuture<'static, Result<Self::Pages>>;
}
