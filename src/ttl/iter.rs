//! Lookahead Iterator over Live Entries
//!
//! [`TtlEntries`] walks a store cursor and yields only the live entries. It
//! keeps at most one live entry buffered so that `has_next()` can answer
//! without consuming it.
//!
//! ## State Machine
//!
//! ```text
//!            has_next() finds live entry
//!   Fresh ───────────────────────────────▶ Buffered(k, v)
//!     ▲  │                                       │
//!     │  │ cursor exhausted                      │ next_item()
//!     │  ▼                                       │ (opens removal window)
//!     │ Exhausted (terminal)                     │
//!     └──────────────────────────────────────────┘
//! ```
//!
//! The removal window (`can_remove`) is opened by `next_item()` and closed by
//! every `has_next()`, every `next_item()` and a successful
//! `remove_current()`. Once `has_next()` has run, the store cursor may already
//! sit past the entry the caller last saw, so removing then would delete the
//! wrong entry.

use tracing::{debug, trace};

use super::value::{TimestampedValue, TtlContext};
use crate::state::{Result, StateCursor, StateError};

/// Maps a live `(key, value)` pair to the item an iterator yields.
pub type Projection<K, V, R> = fn(K, Option<V>) -> R;

/// Lookahead buffer of the iterator.
#[derive(Debug)]
enum Lookahead<K, V> {
    /// Nothing buffered, cursor not yet probed for the next live entry
    Fresh,
    /// One live entry ready to hand out
    Buffered(K, Option<V>),
    /// No live entries remain
    Exhausted,
}

/// Single-pass iterator over the live entries of a state.
///
/// Yields items through a [`Projection`], so entries, keys and values views
/// are the same state machine. Expired entries are skipped and left in the
/// store.
pub struct TtlEntries<C, K, V, R> {
    cursor: C,
    ctx: TtlContext,
    project: Projection<K, V, R>,
    lookahead: Lookahead<K, V>,
    can_remove: bool,
    skipped: u64,
}

impl<C, K, V, R> TtlEntries<C, K, V, R>
where
    C: StateCursor<K, TimestampedValue<V>>,
{
    pub(crate) fn new(cursor: C, ctx: TtlContext, project: Projection<K, V, R>) -> Self {
        Self {
            cursor,
            ctx,
            project,
            lookahead: Lookahead::Fresh,
            can_remove: false,
            skipped: 0,
        }
    }

    /// Returns `true` if another live entry exists.
    ///
    /// Always closes the removal window. Repeated calls pull nothing more
    /// from the cursor once an entry is buffered.
    pub fn has_next(&mut self) -> Result<bool> {
        self.can_remove = false;
        while let Lookahead::Fresh = self.lookahead {
            match self.cursor.advance()? {
                Some((key, wrapped)) => {
                    let now = self.ctx.now();
                    match self.ctx.check(Some(wrapped), now) {
                        Some(value) => self.lookahead = Lookahead::Buffered(key, value),
                        None => {
                            self.skipped += 1;
                            trace!(now, "skipping expired entry");
                        }
                    }
                }
                None => {
                    debug!(skipped = self.skipped, "live entry iteration exhausted");
                    self.lookahead = Lookahead::Exhausted;
                }
            }
        }
        Ok(matches!(self.lookahead, Lookahead::Buffered(..)))
    }

    /// Consumes the next live entry.
    ///
    /// Fails with [`StateError::EndOfSequence`] when none remain. On success
    /// the removal window is open until the next call on this iterator.
    pub fn next_item(&mut self) -> Result<R> {
        if !self.has_next()? {
            return Err(StateError::EndOfSequence);
        }
        match std::mem::replace(&mut self.lookahead, Lookahead::Fresh) {
            Lookahead::Buffered(key, value) => {
                self.can_remove = true;
                Ok((self.project)(key, value))
            }
            other => {
                self.lookahead = other;
                Err(StateError::EndOfSequence)
            }
        }
    }

    /// Removes the entry returned by the immediately preceding `next_item()`.
    ///
    /// Fails with [`StateError::InvalidIteratorState`] if nothing was
    /// returned yet, if `has_next()` or `next_item()` ran since, or if the
    /// entry was already removed.
    pub fn remove_current(&mut self) -> Result<()> {
        if !self.can_remove {
            return Err(StateError::InvalidIteratorState);
        }
        self.cursor.remove_current()?;
        self.can_remove = false;
        Ok(())
    }

    /// Number of expired entries passed over so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<C, K, V, R> Iterator for TtlEntries<C, K, V, R>
where
    C: StateCursor<K, TimestampedValue<V>>,
{
    type Item = Result<R>;

    /// Yields `Some(Err(_))` once on a store failure, then ends.
    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_item()),
            Ok(false) => None,
            Err(e) => {
                self.lookahead = Lookahead::Exhausted;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ttl::{ManualClock, TtlConfig};
    use std::time::Duration;

    /// Cursor over a fixed list that records every pull and removal.
    struct ScriptedCursor {
        entries: Vec<(&'static str, TimestampedValue<u32>)>,
        position: usize,
        pulls: usize,
        removed: Vec<&'static str>,
        fail_at: Option<usize>,
    }

    impl ScriptedCursor {
        fn new(entries: Vec<(&'static str, TimestampedValue<u32>)>) -> Self {
            Self {
                entries,
                position: 0,
                pulls: 0,
                removed: Vec::new(),
                fail_at: None,
            }
        }
    }

    impl StateCursor<&'static str, TimestampedValue<u32>> for ScriptedCursor {
        fn advance(&mut self) -> Result<Option<(&'static str, TimestampedValue<u32>)>> {
            self.pulls += 1;
            if self.fail_at == Some(self.position) {
                return Err(StateError::Backend("disk on fire".to_string()));
            }
            let next = self.entries.get(self.position).cloned();
            if next.is_some() {
                self.position += 1;
            }
            Ok(next)
        }

        fn remove_current(&mut self) -> Result<()> {
            let key = self.entries[self.position - 1].0;
            self.removed.push(key);
            Ok(())
        }
    }

    fn live(value: u32) -> TimestampedValue<u32> {
        TimestampedValue::new(Some(value), 1000)
    }

    fn expired(value: u32) -> TimestampedValue<u32> {
        TimestampedValue::new(Some(value), 0)
    }

    /// TTL of 1s with the clock at t=1500: writes at t=1000 are live, writes
    /// at t=0 are expired.
    fn entries(
        cursor: ScriptedCursor,
    ) -> TtlEntries<ScriptedCursor, &'static str, u32, (&'static str, Option<u32>)> {
        let ctx = TtlContext::new(
            TtlConfig::new(Duration::from_millis(1000)),
            ManualClock::new(1500),
        );
        TtlEntries::new(cursor, ctx, |k, v| (k, v))
    }

    #[test]
    fn test_skips_expired_entries() {
        let cursor = ScriptedCursor::new(vec![
            ("a", live(1)),
            ("b", expired(2)),
            ("x", expired(3)),
            ("c", live(4)),
        ]);
        let mut iter = entries(cursor);

        let items: Vec<_> = iter.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(items, vec![("a", Some(1)), ("c", Some(4))]);
        assert_eq!(iter.skipped(), 2);
        assert!(iter.cursor.removed.is_empty());
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let cursor = ScriptedCursor::new(vec![("a", expired(1)), ("b", live(2)), ("c", live(3))]);
        let mut iter = entries(cursor);

        assert!(iter.has_next().unwrap());
        assert!(iter.has_next().unwrap());
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.cursor.pulls, 2); // Stops at the first live entry

        assert_eq!(iter.next_item().unwrap(), ("b", Some(2)));
        assert_eq!(iter.cursor.pulls, 2);
    }

    #[test]
    fn test_next_past_end() {
        let cursor = ScriptedCursor::new(vec![("a", live(1)), ("b", expired(2))]);
        let mut iter = entries(cursor);

        assert_eq!(iter.next_item().unwrap(), ("a", Some(1)));
        assert_eq!(iter.next_item(), Err(StateError::EndOfSequence));
        assert_eq!(iter.next_item(), Err(StateError::EndOfSequence));
        assert!(!iter.has_next().unwrap());
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let cursor = ScriptedCursor::new(vec![]);
        let mut iter = entries(cursor);

        assert!(!iter.has_next().unwrap());
        assert!(!iter.has_next().unwrap());
        assert_eq!(iter.cursor.pulls, 1);
    }

    #[test]
    fn test_remove_right_after_next() {
        let cursor = ScriptedCursor::new(vec![("a", live(1)), ("b", live(2))]);
        let mut iter = entries(cursor);

        assert_eq!(iter.next_item().unwrap(), ("a", Some(1)));
        iter.remove_current().unwrap();
        assert_eq!(iter.cursor.removed, vec!["a"]);
    }

    #[test]
    fn test_remove_before_any_next() {
        let cursor = ScriptedCursor::new(vec![("a", live(1))]);
        let mut iter = entries(cursor);

        assert_eq!(iter.remove_current(), Err(StateError::InvalidIteratorState));
    }

    #[test]
    fn test_remove_after_has_next() {
        let cursor = ScriptedCursor::new(vec![("a", live(1)), ("b", live(2))]);
        let mut iter = entries(cursor);

        iter.next_item().unwrap();
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.remove_current(), Err(StateError::InvalidIteratorState));
        assert!(iter.cursor.removed.is_empty());
    }

    #[test]
    fn test_has_next_at_end_still_closes_window() {
        let cursor = ScriptedCursor::new(vec![("a", live(1))]);
        let mut iter = entries(cursor);

        iter.next_item().unwrap();
        assert!(!iter.has_next().unwrap());
        assert_eq!(iter.remove_current(), Err(StateError::InvalidIteratorState));
    }

    #[test]
    fn test_remove_twice_fails() {
        let cursor = ScriptedCursor::new(vec![("a", live(1))]);
        let mut iter = entries(cursor);

        iter.next_item().unwrap();
        iter.remove_current().unwrap();
        assert_eq!(iter.remove_current(), Err(StateError::InvalidIteratorState));
        assert_eq!(iter.cursor.removed, vec!["a"]);
    }

    #[test]
    fn test_remove_with_iterator_protocol() {
        let cursor = ScriptedCursor::new(vec![("a", live(1)), ("b", expired(2)), ("c", live(3))]);
        let mut iter = entries(cursor);

        while let Some(item) = iter.next() {
            let (key, _) = item.unwrap();
            if key == "c" {
                iter.remove_current().unwrap();
            }
        }
        assert_eq!(iter.cursor.removed, vec!["c"]);
    }

    #[test]
    fn test_store_failure_propagates() {
        let mut cursor = ScriptedCursor::new(vec![("a", live(1)), ("b", live(2))]);
        cursor.fail_at = Some(1);
        let mut iter = entries(cursor);

        assert_eq!(iter.next().unwrap().unwrap(), ("a", Some(1)));
        assert_eq!(
            iter.next(),
            Some(Err(StateError::Backend("disk on fire".to_string())))
        );
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_projection_strategy() {
        let ctx = TtlContext::new(
            TtlConfig::new(Duration::from_millis(1000)),
            ManualClock::new(1500),
        );
        let cursor = ScriptedCursor::new(vec![("a", live(1)), ("b", expired(2))]);
        let keys = TtlEntries::new(cursor, ctx, |k: &'static str, _: Option<u32>| k);

        assert_eq!(keys.collect::<Result<Vec<_>>>().unwrap(), vec!["a"]);
    }
}
