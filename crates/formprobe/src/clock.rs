//! Time sources for polling waits.
//!
//! Every wait in formprobe reads time and sleeps through a [`Clock`], so the
//! timing policy can run against [`ManualClock`] in tests: sleeping on a
//! manual clock advances virtual time instantly instead of blocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source used by the waiter
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Block the calling thread (or advance virtual time) for `duration`
    fn sleep(&self, duration: Duration);

    /// Time elapsed since an earlier `now()` reading
    fn since(&self, earlier: Duration) -> Duration {
        self.now().saturating_sub(earlier)
    }
}

/// Wall clock; `sleep` blocks the calling thread
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Virtual clock for deterministic tests.
///
/// Clones share the same time, so a mock session and the waiter polling it
/// observe one timeline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Arc<AtomicU64>,
    sleeps: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock at t = 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, duration: Duration) {
        let _ = self
            .now_us
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    /// Move time forward by milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Current virtual time in milliseconds
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst) / 1_000
    }

    /// Number of `sleep` calls made so far
    #[must_use]
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.now_us.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        let _ = self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}
