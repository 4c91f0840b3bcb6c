//! Clock abstraction.
//!
//! Time-dependent operations take an injected clock rather than reading
//! `SystemTime` directly, so retention-cycle behaviour is deterministic
//! under test. Production code uses [`SystemClock`]; tests use
//! [`FixedClock`] and advance it explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of current wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current time in nanoseconds since the Unix epoch.
    fn now_ns(&self) -> u64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)] // u64 nanoseconds last until 2554
    fn now_ns(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Test clock that returns a settable constant timestamp.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ns: AtomicU64,
}

impl FixedClock {
    /// Creates a clock frozen at `now_ns` nanoseconds since the epoch.
    #[must_use]
    pub fn new(now_ns: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(now_ns),
        }
    }

    /// Moves the clock forward by `delta`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, delta: Duration) {
        self.now_ns
            .fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute timestamp.
    pub fn set_ns(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(1_000);
        assert_eq!(clock.now_ns(), 1_000);

        clock.advance(Duration::from_nanos(500));
        assert_eq!(clock.now_ns(), 1_500);

        clock.set_ns(42);
        assert_eq!(clock.now_ns(), 42);
    }

    #[test]
    fn system_clock_is_nonzero_and_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(a > 0);
        assert!(b >= a);
    }
}
