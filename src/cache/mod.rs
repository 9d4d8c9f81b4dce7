//! Virtual-to-Physical Cache
//!
//! A fixed-capacity, direct-mapped table of virtual→physical bindings. Each
//! key maps to exactly one slot (CRC-32 of the key's octets modulo the
//! capacity); a colliding insert replaces or is refused by the occupant,
//! there is no chaining.

mod slot;
mod store;

use thiserror::Error;

pub use slot::{Binding, Displaced, InsertOutcome, Slot};
pub use store::{CacheStore, DEFAULT_CACHE_CAPACITY};

/// Errors related to cache construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be non-zero")]
    ZeroCapacity,
}

/// Slot occupancy snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of slots.
    pub capacity: usize,
    /// Slots never written since startup or the last clear.
    pub empty: usize,
    /// Slots whose binding was invalidated.
    pub invalidated: usize,
    /// Slots holding a live binding.
    pub valid: usize,
    /// Live slots whose access bit is set.
    pub active: usize,
}

impl CacheStats {
    /// Fill ratio (valid / capacity).
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.valid as f64 / self.capacity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_fill_ratio() {
        let stats = CacheStats {
            capacity: 100,
            empty: 40,
            invalidated: 10,
            valid: 50,
            active: 5,
        };
        assert!((stats.fill_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_stats_fill_ratio_zero_capacity() {
        let stats = CacheStats::default();
        assert!((stats.fill_ratio() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_error_display() {
        assert_eq!(
            CacheError::ZeroCapacity.to_string(),
            "cache capacity must be non-zero"
        );
    }
}
