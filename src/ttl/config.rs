//! TTL Policy and Time Sources
//!
//! The TTL layer never decides on its own whether an entry is expired. It asks
//! a [`TtlPolicy`] and reads the current time from a [`TimeProvider`].
//!
//! [`TtlConfig`] is the stock policy: an entry written at `t0` is live while
//! `now - t0 < ttl`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds, either since the Unix epoch or since a clock's own origin.
pub type Timestamp = u64;

/// Source of the current time.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the TTL layer.
///
/// # Example
///
/// ```
/// use flashttl::ttl::{ManualClock, TimeProvider};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(0);
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(clock.now(), 500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward, stopping at `Timestamp::MAX`.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(by))
            });
    }
}

impl TimeProvider for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Decides whether a value written at `written_at` is still live at `now`.
pub trait TtlPolicy: Send + Sync {
    fn is_live(&self, written_at: Timestamp, now: Timestamp) -> bool;
}

impl<F> TtlPolicy for F
where
    F: Fn(Timestamp, Timestamp) -> bool + Send + Sync,
{
    fn is_live(&self, written_at: Timestamp, now: Timestamp) -> bool {
        self(written_at, now)
    }
}

/// Fixed time-to-live for every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlConfig {
    /// How long an entry stays live after its last write (default: 60s)
    pub ttl: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
        }
    }
}

impl TtlConfig {
    /// Creates a config with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Sets the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Time-to-live in milliseconds, saturating at `u64::MAX`.
    pub fn ttl_ms(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }

    /// First instant at which a value written at `written_at` is expired.
    pub fn expires_at(&self, written_at: Timestamp) -> Timestamp {
        written_at.saturating_add(self.ttl_ms())
    }
}

impl TtlPolicy for TtlConfig {
    #[inline]
    fn is_live(&self, written_at: Timestamp, now: Timestamp) -> bool {
        now < self.expires_at(written_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_until_ttl_elapses() {
        let config = TtlConfig::new(Duration::from_millis(1000));

        assert!(config.is_live(0, 0));
        assert!(config.is_live(0, 999));
        assert!(!config.is_live(0, 1000)); // Boundary is expired
        assert!(!config.is_live(0, 1500));
    }

    #[test]
    fn test_expiry_saturates() {
        let config = TtlConfig::new(Duration::MAX);

        assert_eq!(config.ttl_ms(), u64::MAX);
        assert_eq!(config.expires_at(10), u64::MAX);
        assert!(config.is_live(u64::MAX - 1, u64::MAX - 1));
    }

    #[test]
    fn test_builder() {
        let config = TtlConfig::default().with_ttl(Duration::from_secs(5));
        assert_eq!(config.ttl_ms(), 5000);
    }

    #[test]
    fn test_closure_policy() {
        let never = |_: Timestamp, _: Timestamp| false;
        assert!(!never.is_live(0, 0));
    }

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new(100);
        let handle = clock.clone();

        handle.advance(Duration::from_millis(50));
        assert_eq!(clock.now(), 150);

        clock.set(10);
        assert_eq!(handle.now(), 10);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(u64::MAX - 5);
        clock.advance(Duration::from_millis(10));
        assert_eq!(clock.now(), u64::MAX);

        let clock = ManualClock::new(0);
        clock.advance(Duration::MAX);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(first > 0);
        assert!(clock.now() >= first);
    }
}
