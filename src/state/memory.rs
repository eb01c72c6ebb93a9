//! In-Memory State Store
//!
//! A reference implementation of both [`MapState`] and [`AsyncMapState`]
//! backed by one ordered map.
//!
//! ## Design Decisions
//!
//! 1. **Ordered map**: Entries live in a `BTreeMap`, so iteration order is the
//!    key order and a cursor can resume after the last key it returned even
//!    if that key was removed in the meantime.
//! 2. **Arc<RwLock>**: A `MemoryState` is a cheap handle. Clones share the same
//!    data, which lets a sync view and an async view observe one store.
//! 3. **No expiry**: The store never looks at values. Expired entries stay
//!    here until overwritten or removed.
//!
//! Lock poisoning is reported as [`StateError::Backend`] instead of panicking.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::trace;

use super::{AsyncMapState, EntryPages, MapState, Result, StateCursor, StateError};

/// Number of entries handed out per page by [`MemoryPages`] unless configured.
pub const DEFAULT_PAGE_SIZE: usize = 128;

/// Operation counters shared by all clones of a [`MemoryState`].
#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    puts: AtomicU64,
    removes: AtomicU64,
    pages: AtomicU64,
}

/// Snapshot of store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateStats {
    /// Physically stored entries, expired ones included
    pub entries: u64,
    /// Total point reads
    pub gets: u64,
    /// Total entries written (bulk writes count every entry)
    pub puts: u64,
    /// Total removals, including cursor removals
    pub removes: u64,
    /// Total pages served to async iterators
    pub pages: u64,
}

/// Shared, ordered in-memory key-value store.
///
/// # Example
///
/// ```
/// use flashttl::state::{MapState, MemoryState};
///
/// let mut state = MemoryState::new();
/// state.put("a", 1).unwrap();
/// assert_eq!(state.get(&"a").unwrap(), Some(1));
/// ```
pub struct MemoryState<K, V> {
    data: Arc<RwLock<BTreeMap<K, V>>>,
    counters: Arc<Counters>,
    page_size: usize,
}

impl<K, V> Clone for MemoryState<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            counters: Arc::clone(&self.counters),
            page_size: self.page_size,
        }
    }
}

impl<K, V> std::fmt::Debug for MemoryState<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryState")
            .field("page_size", &self.page_size)
            .field("gets", &self.counters.gets.load(Ordering::Relaxed))
            .field("puts", &self.counters.puts.load(Ordering::Relaxed))
            .field("removes", &self.counters.removes.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K: Ord + Clone, V: Clone> Default for MemoryState<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> MemoryState<K, V> {
    /// Creates an empty store with the default page size.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            counters: Arc::new(Counters::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many entries each async page carries. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Returns the configured page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<K, V>>> {
        self.data
            .read()
            .map_err(|_| StateError::Backend("state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<K, V>>> {
        self.data
            .write()
            .map_err(|_| StateError::Backend("state lock poisoned".to_string()))
    }

    /// Reads the raw stored value for a key.
    pub fn lookup(&self, key: &K) -> Result<Option<V>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.read()?.get(key).cloned())
    }

    /// Stores a value, overwriting any previous one.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        self.write()?.insert(key, value);
        Ok(())
    }

    /// Stores all entries under one write lock.
    pub fn insert_all(&self, entries: Vec<(K, V)>) -> Result<()> {
        self.counters
            .puts
            .fetch_add(entries.len() as u64, Ordering::Relaxed);
        let mut data = self.write()?;
        data.extend(entries);
        Ok(())
    }

    /// Deletes a key. Returns `true` if it was stored.
    pub fn delete(&self, key: &K) -> Result<bool> {
        self.counters.removes.fetch_add(1, Ordering::Relaxed);
        Ok(self.write()?.remove(key).is_some())
    }

    /// Checks whether a key is physically stored.
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store holds no entries at all.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Removes every entry.
    pub fn clear_all(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Returns store statistics.
    pub fn stats(&self) -> Result<StateStats> {
        Ok(StateStats {
            entries: self.len()? as u64,
            gets: self.counters.gets.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            removes: self.counters.removes.load(Ordering::Relaxed),
            pages: self.counters.pages.load(Ordering::Relaxed),
        })
    }

    /// Returns the first entry strictly after `after`, or the first entry
    /// overall when `after` is `None`.
    fn entry_after(&self, after: Option<&K>) -> Result<Option<(K, V)>> {
        let data = self.read()?;
        let next = match after {
            Some(last) => data
                .range::<K, _>((Bound::Excluded(last), Bound::Unbounded))
                .next(),
            None => data.iter().next(),
        };
        Ok(next.map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Returns up to `limit` entries strictly after `after`.
    fn page_after(&self, after: Option<&K>, limit: usize) -> Result<Vec<(K, V)>> {
        let data = self.read()?;
        let page = match after {
            Some(last) => data
                .range::<K, _>((Bound::Excluded(last), Bound::Unbounded))
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => data
                .iter()
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(page)
    }
}

/// Cursor over a [`MemoryState`], resuming after the last returned key.
#[derive(Debug)]
pub struct MemoryCursor<'a, K, V> {
    state: &'a MemoryState<K, V>,
    last: Option<K>,
}

impl<K: Ord + Clone, V: Clone> StateCursor<K, V> for MemoryCursor<'_, K, V> {
    fn advance(&mut self) -> Result<Option<(K, V)>> {
        let next = self.state.entry_after(self.last.as_ref())?;
        if let Some((key, _)) = &next {
            self.last = Some(key.clone());
        }
        Ok(next)
    }

    fn remove_current(&mut self) -> Result<()> {
        match &self.last {
            Some(key) => {
                self.state.delete(key)?;
                Ok(())
            }
            None => Err(StateError::InvalidIteratorState),
        }
    }
}

impl<K: Ord + Clone, V: Clone> MapState<K, V> for MemoryState<K, V> {
    type Cursor<'a>
        = MemoryCursor<'a, K, V>
    where
        Self: 'a;

    fn get(&self, key: &K) -> Result<Option<V>> {
        self.lookup(key)
    }

    fn put(&mut self, key: K, value: V) -> Result<()> {
        self.insert(key, value)
    }

    fn put_all(&mut self, entries: Vec<(K, V)>) -> Result<()> {
        self.insert_all(entries)
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        self.delete(key).map(|_| ())
    }

    fn contains(&self, key: &K) -> Result<bool> {
        self.contains_key(key)
    }

    fn is_empty(&self) -> Result<bool> {
        MemoryState::is_empty(self)
    }

    fn clear(&mut self) -> Result<()> {
        self.clear_all()
    }

    fn entries(&mut self) -> Result<Self::Cursor<'_>> {
        Ok(MemoryCursor {
            state: self,
            last: None,
        })
    }
}

/// One-pass page source over a [`MemoryState`].
///
/// Pages are read lazily, so writes made between pages are visible to later
/// pages.
#[derive(Debug)]
pub struct MemoryPages<K, V> {
    state: MemoryState<K, V>,
    last: Option<K>,
    done: bool,
}

impl<K: Ord + Clone, V: Clone> MemoryPages<K, V> {
    fn take_page(&mut self) -> Result<Option<Vec<(K, V)>>> {
        if self.done {
            return Ok(None);
        }
        let page = self
            .state
            .page_after(self.last.as_ref(), self.state.page_size)?;
        if page.len() < self.state.page_size {
            self.done = true;
        }
        if page.is_empty() {
            return Ok(None);
        }
        self.last = page.last().map(|(key, _)| key.clone());
        self.state.counters.pages.fetch_add(1, Ordering::Relaxed);
        trace!(entries = page.len(), "serving state page");
        Ok(Some(page))
    }
}

impl<K, V> EntryPages<K, V> for MemoryPages<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn next_page(&mut self) -> BoxFuture<'_, Result<Option<Vec<(K, V)>>>> {
        async move { self.take_page() }.boxed()
    }
}

impl<K, V> AsyncMapState<K, V> for MemoryState<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Pages = MemoryPages<K, V>;

    fn async_get(&self, key: K) -> BoxFuture<'static, Result<Option<V>>> {
        let state = self.clone();
        async move { state.lookup(&key) }.boxed()
    }

    fn async_put(&self, key: K, value: V) -> BoxFuture<'static, Result<()>> {
        let state = self.clone();
        async move { state.insert(key, value) }.boxed()
    }

    fn async_put_all(&self, entries: Vec<(K, V)>) -> BoxFuture<'static, Result<()>> {
        let state = self.clone();
        async move { state.insert_all(entries) }.boxed()
    }

    fn async_remove(&self, key: K) -> BoxFuture<'static, Result<()>> {
        let state = self.clone();
        async move { state.delete(&key).map(|_| ()) }.boxed()
    }

    fn async_contains(&self, key: K) -> BoxFuture<'static, Result<bool>> {
        let state = self.clone();
        async move { state.contains_key(&key) }.boxed()
    }

    fn async_is_empty(&self) -> BoxFuture<'static, Result<bool>> {
        let state = self.clone();
        async move { MemoryState::is_empty(&state) }.boxed()
    }

    fn async_clear(&self) -> BoxFuture<'static, Result<()>> {
        let state = self.clone();
        async move { state.clear_all() }.boxed()
    }

    fn async_entries(&self) -> BoxFuture<'static, Result<Self::Pages>> {
        let state = self.clone();
        async move {
            Ok(MemoryPages {
                state,
                last: None,
                done: false,
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let mut state = MemoryState::new();

        state.put("key", 1).unwrap();
        assert_eq!(state.get(&"key").unwrap(), Some(1));
        assert_eq!(state.get(&"missing").unwrap(), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut state = MemoryState::new();

        state.put_all(vec![("a", 1), ("b", 2)]).unwrap();
        state.remove(&"a").unwrap();
        assert!(!state.contains(&"a").unwrap());
        assert!(state.contains(&"b").unwrap());

        state.clear().unwrap();
        assert!(MapState::is_empty(&state).unwrap());
    }

    #[test]
    fn test_cursor_order_and_removal() {
        let mut state = MemoryState::new();
        state.put_all(vec![("c", 3), ("a", 1), ("b", 2)]).unwrap();

        let mut cursor = state.entries().unwrap();
        assert!(cursor.remove_current().is_err()); // Nothing returned yet

        assert_eq!(cursor.advance().unwrap(), Some(("a", 1)));
        assert_eq!(cursor.advance().unwrap(), Some(("b", 2)));
        cursor.remove_current().unwrap();
        assert_eq!(cursor.advance().unwrap(), Some(("c", 3)));
        assert_eq!(cursor.advance().unwrap(), None);
        assert_eq!(cursor.advance().unwrap(), None);

        assert_eq!(state.len().unwrap(), 2);
        assert!(!state.contains(&"b").unwrap());
    }

    #[test]
    fn test_clones_share_data() {
        let state = MemoryState::new();
        let mut other = state.clone();

        other.put("shared", 7).unwrap();
        assert_eq!(state.lookup(&"shared").unwrap(), Some(7));
    }

    #[test]
    fn test_stats() {
        let mut state = MemoryState::new();

        state.put("a", 1).unwrap();
        state.put_all(vec![("b", 2), ("c", 3)]).unwrap();
        state.get(&"a").unwrap();
        state.remove(&"c").unwrap();

        let stats = state.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.puts, 3);
        assert_eq!(stats.gets, 1);
        assert_eq!(stats.removes, 1);
    }

    #[tokio::test]
    async fn test_async_operations() {
        let state = MemoryState::new();

        state.async_put("a", 1).await.unwrap();
        state.async_put_all(vec![("b", 2)]).await.unwrap();
        assert_eq!(state.async_get("a").await.unwrap(), Some(1));
        assert!(state.async_contains("b").await.unwrap());

        state.async_remove("a").await.unwrap();
        assert!(!state.async_contains("a").await.unwrap());
        assert!(!state.async_is_empty().await.unwrap());

        state.async_clear().await.unwrap();
        assert!(state.async_is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_paged_entries() {
        let state = MemoryState::new().with_page_size(2);
        state
            .async_put_all((0..5).map(|i| (i, i * 10)).collect())
            .await
            .unwrap();

        let mut pages = state.async_entries().await.unwrap();
        let mut sizes = Vec::new();
        let mut seen = Vec::new();
        while let Some(page) = pages.next_page().await.unwrap() {
            sizes.push(page.len());
            seen.extend(page.into_iter().map(|(k, _)| k));
        }

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(state.stats().unwrap().pages, 3);
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let state: MemoryState<u32, u32> = MemoryState::new().with_page_size(0);
        assert_eq!(state.page_size(), 1);
    }
}
