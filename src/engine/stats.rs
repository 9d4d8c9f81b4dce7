//! Packet-processing counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated from the packet path through `&self`.
#[derive(Debug, Default)]
pub struct SwitchStats {
    processed: AtomicU64,
    malformed: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    learned: AtomicU64,
    evictions_spilled: AtomicU64,
    spills_dropped: AtomicU64,
    refusals: AtomicU64,
    invalidations_applied: AtomicU64,
    misdeliveries: AtomicU64,
    invalidations_sent: AtomicU64,
    invalidations_suppressed: AtomicU64,
}

/// Point-in-time copy of [`SwitchStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Packets that decoded and were processed.
    pub processed: u64,
    /// Packets dropped for failing to decode.
    pub malformed: u64,
    /// Gateway-bound packets resolved from the cache.
    pub hits: u64,
    /// Gateway-bound packets left unresolved.
    pub misses: u64,
    /// Bindings written by learning, EVICT or LEARN.
    pub learned: u64,
    /// Displaced bindings pushed toward the next tier.
    pub evictions_spilled: u64,
    /// Spills withheld because an INVALIDATE took the output slot.
    pub spills_dropped: u64,
    /// Installs refused by an active occupant.
    pub refusals: u64,
    /// Local invalidations that removed a binding.
    pub invalidations_applied: u64,
    /// Misdelivered packets detected.
    pub misdeliveries: u64,
    /// INVALIDATE packets generated.
    pub invalidations_sent: u64,
    /// INVALIDATE packets withheld by the suppression window.
    pub invalidations_suppressed: u64,
}

impl SwitchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_learned(&self) {
        self.learned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction_spilled(&self) {
        self.evictions_spilled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spill_dropped(&self) {
        self.spills_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refusal(&self) {
        self.refusals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation_applied(&self) {
        self.invalidations_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_misdelivery(&self) {
        self.misdeliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation_sent(&self) {
        self.invalidations_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation_suppressed(&self) {
        self.invalidations_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            learned: self.learned.load(Ordering::Relaxed),
            evictions_spilled: self.evictions_spilled.load(Ordering::Relaxed),
            spills_dropped: self.spills_dropped.load(Ordering::Relaxed),
            refusals: self.refusals.load(Ordering::Relaxed),
            invalidations_applied: self.invalidations_applied.load(Ordering::Relaxed),
            misdeliveries: self.misdeliveries.load(Ordering::Relaxed),
            invalidations_sent: self.invalidations_sent.load(Ordering::Relaxed),
            invalidations_suppressed: self.invalidations_suppressed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = SwitchStats::new();
        stats.record_processed();
        stats.record_processed();
        stats.record_hit();
        stats.record_invalidation_suppressed();

        let snap = stats.snapshot();
        assert_eq!(snap.processed, 2);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.invalidations_suppressed, 1);
        assert_eq!(snap.misses, 0);
    }
}
