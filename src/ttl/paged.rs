//! Paged Asynchronous Iteration over Live Entries
//!
//! [`TtlStateIterator`] drains an [`EntryPages`] source page by page and hands
//! only live entries to caller logic. Two consumption modes:
//!
//! - [`on_next`](TtlStateIterator::on_next): the callback returns a future per
//!   item; results are collected in source order.
//! - [`for_each`](TtlStateIterator::for_each): the callback consumes each item
//!   and returns nothing.
//!
//! ## Ordering
//!
//! All live items of a page are handed to the callback in source order, and
//! every derived future of that page completes before the next page is
//! requested. Expired items never reach the callback and are not counted.

use std::future::Future;

use futures::future::try_join_all;
use tracing::{debug, trace};

use super::config::Timestamp;
use super::iter::Projection;
use super::value::{TimestampedValue, TtlContext};
use crate::state::{EntryPages, Result};

/// One-pass asynchronous iterator over the live entries of a state.
pub struct TtlStateIterator<P, K, V, R> {
    pages: P,
    ctx: TtlContext,
    project: Projection<K, V, R>,
}

impl<P, K, V, R> TtlStateIterator<P, K, V, R>
where
    P: EntryPages<K, TimestampedValue<V>>,
{
    pub(crate) fn new(pages: P, ctx: TtlContext, project: Projection<K, V, R>) -> Self {
        Self {
            pages,
            ctx,
            project,
        }
    }

    /// Filters one raw entry, returning the projected item if it is live.
    fn live(&self, key: K, wrapped: TimestampedValue<V>, now: Timestamp) -> Option<R> {
        match self.ctx.check(Some(wrapped), now) {
            Some(value) => Some((self.project)(key, value)),
            None => {
                trace!(now, "skipping expired entry");
                None
            }
        }
    }

    /// Collecting mode.
    ///
    /// Calls `f` for every live item and resolves to the results of all
    /// derived futures, in source order, once the source is drained. The
    /// first failing page or derived future fails the whole iteration.
    pub async fn on_next<U, F, Fut>(mut self, mut f: F) -> Result<Vec<U>>
    where
        F: FnMut(R) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        let mut results = Vec::new();
        let mut pages = 0u64;
        while let Some(page) = self.pages.next_page().await? {
            pages += 1;
            let now = self.ctx.now();
            let pending: Vec<Fut> = page
                .into_iter()
                .filter_map(|(key, wrapped)| self.live(key, wrapped, now))
                .map(&mut f)
                .collect();
            results.extend(try_join_all(pending).await?);
        }
        debug!(pages, collected = results.len(), "paged iteration complete");
        Ok(results)
    }

    /// Fire-and-forget mode.
    ///
    /// Feeds every live item to `f` and resolves once the source is drained.
    pub async fn for_each<F>(mut self, mut f: F) -> Result<()>
    where
        F: FnMut(R) -> Result<()>,
    {
        let mut pages = 0u64;
        let mut delivered = 0u64;
        while let Some(page) = self.pages.next_page().await? {
            pages += 1;
            let now = self.ctx.now();
            for (key, wrapped) in page {
                if let Some(item) = self.live(key, wrapped, now) {
                    f(item)?;
                    delivered += 1;
                }
            }
        }
        debug!(pages, delivered, "paged iteration complete");
        Ok(())
    }

    /// Always `false`: a paged source cannot know it holds no live entries
    /// without being drained.
    pub fn is_empty(&self) -> bool {
        false
    }
}
