//! Misdelivery invalidation suppression.
//!
//! When a switch detects misdelivered traffic it tells the resolving switch
//! (the packet's origin id) to drop its stale binding. Until that
//! invalidation has had time to take effect, further misdeliveries from the
//! same origin are expected and must not trigger another one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default suppression window (milliseconds).
pub const DEFAULT_RETRANSMIT_TIMEOUT_MS: u64 = 8;

/// Longest accepted suppression window; longer values are clamped.
pub const MAX_RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Per-origin suppression deadlines for misdelivery invalidations.
#[derive(Debug)]
pub struct PendingInvalidations {
    /// Maps origin switch id to the time a new invalidation may be sent.
    deadlines: Mutex<HashMap<u8, Instant>>,
    /// Suppression window in nanoseconds, read per event.
    timeout_ns: AtomicU64,
}

impl PendingInvalidations {
    /// Create an empty table with the given window.
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadlines: Mutex::new(HashMap::new()),
            timeout_ns: AtomicU64::new(Self::to_nanos(timeout)),
        }
    }

    /// Current suppression window.
    pub fn timeout(&self) -> Duration {
        Duration::from_nanos(self.timeout_ns.load(Ordering::Relaxed))
    }

    /// Change the suppression window. Applies to deadlines armed afterwards.
    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ns
            .store(Self::to_nanos(timeout), Ordering::Relaxed);
    }

    fn to_nanos(timeout: Duration) -> u64 {
        // The cap fits in u64 nanoseconds.
        timeout.min(MAX_RETRANSMIT_TIMEOUT).as_nanos() as u64
    }

    /// Check whether an invalidation for `origin` should go out at `now`.
    ///
    /// Returns true when no unexpired deadline exists for `origin`, and arms
    /// a new deadline at `now + timeout` in the same step.
    pub fn should_send(&self, origin: u8, now: Instant) -> bool {
        let mut deadlines = self
            .deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(&deadline) = deadlines.get(&origin)
            && now < deadline
        {
            return false;
        }

        deadlines.insert(origin, now + self.timeout());
        Self::cleanup_locked(&mut deadlines, now);
        true
    }

    /// Remove expired deadlines.
    pub fn cleanup(&self, now: Instant) -> usize {
        let mut deadlines = self
            .deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Self::cleanup_locked(&mut deadlines, now)
    }

    fn cleanup_locked(deadlines: &mut HashMap<u8, Instant>, now: Instant) -> usize {
        let before = deadlines.len();
        deadlines.retain(|_, &mut deadline| now < deadline);
        before - deadlines.len()
    }

    /// Number of tracked origins.
    pub fn len(&self) -> usize {
        self.deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingInvalidations {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_RETRANSMIT_TIMEOUT_MS))
    }
}
