//! Timestamped Values and the Liveness Filter
//!
//! Every value written through the TTL layer is wrapped in a
//! [`TimestampedValue`] carrying the time of the write. Every read path runs
//! the stored wrapper through [`check`], the single liveness function shared
//! by the sync facade, the async facade and both iterators.
//!
//! ## Lookup results
//!
//! A lookup yields `Option<Option<V>>`:
//!
//! ```text
//! None           -> no live value (never written, removed, or expired)
//! Some(None)     -> live entry whose value is an explicit null
//! Some(Some(v))  -> live value
//! ```

use std::sync::Arc;

use super::config::{SystemClock, TimeProvider, Timestamp, TtlConfig, TtlPolicy};

/// A user value together with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedValue<V> {
    value: Option<V>,
    written_at: Timestamp,
}

impl<V> TimestampedValue<V> {
    /// Wraps `value` (which may be an explicit null) with a write time.
    pub fn new(value: Option<V>, written_at: Timestamp) -> Self {
        Self { value, written_at }
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }

    pub fn written_at(&self) -> Timestamp {
        self.written_at
    }
}

/// The liveness filter.
///
/// Pure: it never touches the store, so an entry that fails the check stays
/// physically where it is.
#[inline]
pub fn check<V>(
    wrapper: Option<TimestampedValue<V>>,
    now: Timestamp,
    policy: &dyn TtlPolicy,
) -> Option<Option<V>> {
    let wrapper = wrapper?;
    match wrapper.value {
        // Explicit nulls are live entries, not expired ones
        None => Some(None),
        Some(value) if policy.is_live(wrapper.written_at, now) => Some(Some(value)),
        Some(_) => None,
    }
}

/// Policy and clock shared by every TTL facade and iterator built over one
/// state.
///
/// Cheap to clone; futures of the async facade carry their own clone.
#[derive(Clone)]
pub struct TtlContext {
    policy: Arc<dyn TtlPolicy>,
    clock: Arc<dyn TimeProvider>,
}

impl std::fmt::Debug for TtlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlContext")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

impl TtlContext {
    pub fn new(policy: impl TtlPolicy + 'static, clock: impl TimeProvider + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
            clock: Arc::new(clock),
        }
    }

    /// Fixed TTL against the wall clock.
    pub fn from_config(config: TtlConfig) -> Self {
        Self::new(config, SystemClock)
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Wraps a value with the current time.
    pub fn wrap<V>(&self, value: Option<V>) -> TimestampedValue<V> {
        TimestampedValue::new(value, self.now())
    }

    /// Applies the liveness filter at `now`.
    #[inline]
    pub fn check<V>(&self, wrapper: Option<TimestampedValue<V>>, now: Timestamp) -> Option<Option<V>> {
        check(wrapper, now, self.policy.as_ref())
    }
}
