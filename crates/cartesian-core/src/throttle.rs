//! Warning throttle - rate-limits diagnostics emitted from hot or concurrent paths
//!
//! **App Start Relative Time Pattern**:
//! - Timestamps are monotonic microseconds relative to the throttle's creation
//! - Stored in an `AtomicU64`, so checking never takes a lock
//! - Safe to call from several threads at once; exactly one caller wins each window

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sentinel for "never emitted"
const NEVER: u64 = u64::MAX;

/// Lock-free diagnostic throttle
///
/// At most one emission is granted per `interval`. Calls inside the window are
/// counted as suppressed; the count is handed to the next granted emission.
#[derive(Debug)]
pub struct WarnThrottle {
    anchor: Instant,
    interval: Duration,
    last_emit_us: AtomicU64,
    suppressed: AtomicU64,
}

impl WarnThrottle {
    /// Create a throttle that grants one emission per `interval`
    ///
    /// # Example
    /// ```
    /// # use cartesian_core::throttle::WarnThrottle;
    /// # use std::time::Duration;
    /// let throttle = WarnThrottle::new(Duration::from_secs(3));
    /// assert_eq!(throttle.check(), Some(0));
    /// assert_eq!(throttle.check(), None);
    /// ```
    pub fn new(interval: Duration) -> Self {
        Self {
            anchor: Instant::now(),
            interval,
            last_emit_us: AtomicU64::new(NEVER),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Ask for permission to emit
    ///
    /// Returns `Some(suppressed)` with the number of calls suppressed since the
    /// previous emission, or `None` if the caller should stay quiet.
    pub fn check(&self) -> Option<u64> {
        let now_us = self.anchor.elapsed().as_micros() as u64;
        let last_us = self.last_emit_us.load(Ordering::Relaxed);

        if last_us != NEVER
            && Duration::from_micros(now_us.saturating_sub(last_us)) < self.interval
        {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match self.last_emit_us.compare_exchange(
            last_us,
            now_us,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => Some(self.suppressed.swap(0, Ordering::Relaxed)),
            Err(_) => {
                // Another thread took this window
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Calls suppressed since the last granted emission
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
