//! Direct-mapped slot store.

use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::slot::{Binding, Displaced, InsertOutcome, Slot};
use super::{CacheError, CacheStats};
use crate::utils::addr_hash;

/// Default number of slots.
pub const DEFAULT_CACHE_CAPACITY: usize = 8192;

/// Fixed-capacity, direct-mapped cache of virtual→physical bindings.
///
/// Every slot sits behind its own lock, so operations on keys that hash to
/// different slots never contend, and each operation is atomic on its slot.
#[derive(Debug)]
pub struct CacheStore {
    slots: Box<[Mutex<Slot>]>,
    /// Clear a live occupant's access bit on a colliding miss.
    second_chance: bool,
}

impl CacheStore {
    /// Create a store with `capacity` empty slots.
    pub fn new(capacity: usize, second_chance: bool) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self::build(capacity, second_chance))
    }

    /// Create a store with the default capacity.
    pub fn with_defaults() -> Self {
        Self::build(DEFAULT_CACHE_CAPACITY, false)
    }

    fn build(capacity: usize, second_chance: bool) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(Slot::Empty)).collect(),
            second_chance,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether colliding misses age the occupant.
    pub fn second_chance(&self) -> bool {
        self.second_chance
    }

    /// Slot index for `key`.
    pub fn slot_index(&self, key: Ipv4Addr) -> usize {
        addr_hash(key) as usize % self.slots.len()
    }

    fn lock(&self, idx: usize) -> MutexGuard<'_, Slot> {
        // Slot writes are whole-value assignments, so a poisoned slot is
        // still consistent.
        self.slots[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_for(&self, key: Ipv4Addr) -> MutexGuard<'_, Slot> {
        self.lock(self.slot_index(key))
    }

    /// Look up `key`, marking the slot as recently used on a hit.
    pub fn lookup(&self, key: Ipv4Addr) -> Option<Ipv4Addr> {
        let mut slot = self.slot_for(key);
        match &mut *slot {
            Slot::Valid {
                key: k,
                value,
                access_bit,
            } => {
                if *k == key {
                    *access_bit = true;
                    Some(*value)
                } else {
                    if self.second_chance {
                        *access_bit = false;
                    }
                    None
                }
            }
            _ => None,
        }
    }

    /// Install `key -> value` unless `protect_if_active` is set and a
    /// recently used binding for a different key holds the slot.
    ///
    /// Installed bindings start with the access bit cleared.
    pub fn insert_with_policy(
        &self,
        key: Ipv4Addr,
        value: Ipv4Addr,
        protect_if_active: bool,
    ) -> InsertOutcome {
        let mut slot = self.slot_for(key);
        let displaced = match *slot {
            Slot::Valid {
                key: k,
                value: v,
                access_bit,
            } if k != key => {
                if protect_if_active && access_bit {
                    return InsertOutcome::Refused(Binding::new(k, v));
                }
                Displaced::Evicted(Binding::new(k, v))
            }
            Slot::Valid { .. } => Displaced::Refreshed,
            Slot::Empty | Slot::Invalidated => Displaced::Vacant,
        };
        *slot = Slot::valid(key, value, false);
        InsertOutcome::Installed(displaced)
    }

    /// Invalidate `key` if its slot still holds it, regardless of the access
    /// bit. Returns whether anything changed.
    pub fn invalidate(&self, key: Ipv4Addr) -> bool {
        let mut slot = self.slot_for(key);
        if slot.holds(key) {
            *slot = Slot::Invalidated;
            true
        } else {
            false
        }
    }

    /// Unconditionally write `key -> value`.
    ///
    /// Returns the live binding removed, if the slot held a different key.
    pub fn set(&self, key: Ipv4Addr, value: Ipv4Addr, access_bit: bool) -> Option<Binding> {
        let mut slot = self.slot_for(key);
        let displaced = slot.binding().filter(|b| b.key != key);
        *slot = Slot::valid(key, value, access_bit);
        displaced
    }

    /// Read a slot by index.
    pub fn read_slot(&self, idx: usize) -> Option<Slot> {
        if idx >= self.slots.len() {
            return None;
        }
        Some(*self.lock(idx))
    }

    /// Read the slot `key` maps to.
    pub fn peek(&self, key: Ipv4Addr) -> Slot {
        *self.slot_for(key)
    }

    /// Reset every slot to empty.
    pub fn clear(&self) {
        for idx in 0..self.slots.len() {
            *self.lock(idx) = Slot::Empty;
        }
    }

    /// Count slots by state.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            capacity: self.slots.len(),
            ..CacheStats::default()
        };
        for idx in 0..self.slots.len() {
            match *self.lock(idx) {
                Slot::Empty => stats.empty += 1,
                Slot::Invalidated => stats.invalidated += 1,
                Slot::Valid { access_bit, .. } => {
                    stats.valid += 1;
                    if access_bit {
                        stats.active += 1;
                    }
                }
            }
        }
        stats
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn store() -> CacheStore {
        CacheStore::with_defaults()
    }

    // 10.0.0.2 and 10.0.22.103 share slot 7764 at the default capacity.
    const A: &str = "10.0.0.2";
    const A_COLLIDER: &str = "10.0.22.103";

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(CacheStore::new(0, false).unwrap_err(), CacheError::ZeroCapacity);
    }

    #[test]
    fn test_slot_index() {
        let cache = store();
        assert_eq!(cache.capacity(), 8192);
        assert_eq!(cache.slot_index(addr("10.0.0.1")), 4078);
        assert_eq!(cache.slot_index(addr(A)), 7764);
        assert_eq!(cache.slot_index(addr(A_COLLIDER)), 7764);
        assert_eq!(cache.slot_index(addr("150.0.0.1")), 4594);

        let small = CacheStore::new(16, false).unwrap();
        assert_eq!(small.slot_index(addr("10.0.0.1")), 14);
        assert_eq!(small.slot_index(addr("10.0.0.2")), 4);
        assert_eq!(small.slot_index(addr("10.0.0.3")), 2);
        assert_eq!(small.slot_index(addr("10.0.0.4")), 1);
    }

    #[test]
    fn test_default_store_matches_new() {
        let defaults = CacheStore::default();
        let built = CacheStore::new(DEFAULT_CACHE_CAPACITY, false).unwrap();
        assert_eq!(defaults.capacity(), built.capacity());
        assert_eq!(defaults.second_chance(), built.second_chance());
        assert_eq!(defaults.stats(), built.stats());
        assert_eq!(defaults.stats().empty, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_new_store_is_empty() {
        let cache = CacheStore::new(4, false).unwrap();
        for idx in 0..4 {
            assert_eq!(cache.read_slot(idx), Some(Slot::Empty));
        }
        assert_eq!(cache.read_slot(4), None);
        assert_eq!(cache.lookup(addr(A)), None);
    }

    #[test]
    fn test_lookup_after_set() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), false);
        assert_eq!(cache.lookup(addr(A)), Some(addr("132.68.0.2")));
    }

    #[test]
    fn test_lookup_sets_access_bit() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), false);
        assert!(!cache.peek(addr(A)).is_active());
        cache.lookup(addr(A));
        assert!(cache.peek(addr(A)).is_active());
    }

    #[test]
    fn test_lookup_miss_on_collision_does_not_mutate() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), true);
        assert_eq!(cache.lookup(addr(A_COLLIDER)), None);
        assert_eq!(
            cache.peek(addr(A)),
            Slot::valid(addr(A), addr("132.68.0.2"), true)
        );
    }

    #[test]
    fn test_second_chance_miss_clears_occupant_bit() {
        let cache = CacheStore::new(DEFAULT_CACHE_CAPACITY, true).unwrap();
        cache.set(addr(A), addr("132.68.0.2"), true);
        assert_eq!(cache.lookup(addr(A_COLLIDER)), None);
        assert_eq!(
            cache.peek(addr(A)),
            Slot::valid(addr(A), addr("132.68.0.2"), false)
        );
        // The aged occupant no longer protects its slot.
        let outcome = cache.insert_with_policy(addr(A_COLLIDER), addr("132.68.0.3"), true);
        assert!(outcome.installed());
    }

    #[test]
    fn test_insert_into_empty_and_invalidated() {
        let cache = store();
        assert_eq!(
            cache.insert_with_policy(addr(A), addr("132.68.0.2"), true),
            InsertOutcome::Installed(Displaced::Vacant)
        );
        cache.invalidate(addr(A));
        assert_eq!(
            cache.insert_with_policy(addr(A_COLLIDER), addr("132.68.0.3"), true),
            InsertOutcome::Installed(Displaced::Vacant)
        );
    }

    #[test]
    fn test_insert_same_key_refreshes() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), true);
        // Same key is never refused, even when active.
        assert_eq!(
            cache.insert_with_policy(addr(A), addr("132.68.0.9"), true),
            InsertOutcome::Installed(Displaced::Refreshed)
        );
        assert_eq!(
            cache.peek(addr(A)),
            Slot::valid(addr(A), addr("132.68.0.9"), false)
        );
    }

    #[test]
    fn test_insert_evicts_inactive_occupant() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), false);
        let outcome = cache.insert_with_policy(addr(A_COLLIDER), addr("132.68.0.3"), true);
        assert_eq!(
            outcome,
            InsertOutcome::Installed(Displaced::Evicted(Binding::new(
                addr(A),
                addr("132.68.0.2")
            )))
        );
        // Conservation: the evicted key is no longer resolvable here.
        assert_eq!(cache.lookup(addr(A)), None);
        assert_eq!(cache.lookup(addr(A_COLLIDER)), Some(addr("132.68.0.3")));
    }

    #[test]
    fn test_insert_refused_by_active_occupant() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), true);
        let outcome = cache.insert_with_policy(addr(A_COLLIDER), addr("132.68.0.3"), true);
        assert_eq!(
            outcome,
            InsertOutcome::Refused(Binding::new(addr(A), addr("132.68.0.2")))
        );
        assert_eq!(
            cache.peek(addr(A)),
            Slot::valid(addr(A), addr("132.68.0.2"), true)
        );
    }

    #[test]
    fn test_unprotected_insert_evicts_active_occupant() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), true);
        let outcome = cache.insert_with_policy(addr(A_COLLIDER), addr("132.68.0.3"), false);
        assert_eq!(
            outcome.evicted(),
            Some(Binding::new(addr(A), addr("132.68.0.2")))
        );
    }

    #[test]
    fn test_invalidate_then_lookup_misses() {
        let cache = store();
        cache.set(addr(A), addr("132.68.0.2"), true);
        assert!(cache.invalidate(addr(A)));
        assert_eq!(cache.lookup(addr(A)), None);
        assert_eq!(cache.peek(addr(A)), Slot::Invalidated);
    }

    #[test]
    fn test_stale_invalidate_is_noop() {
        let cache = store();
        cache.set(addr(A_COLLIDER), addr("132.68.0.3"), false);
        assert!(!cache.invalidate(addr(A)));
        assert_eq!(cache.lookup(addr(A_COLLIDER)), Some(addr("132.68.0.3")));

        // Invalidating an empty slot leaves it empty.
        assert!(!cache.invalidate(addr("10.0.0.1")));
        assert_eq!(cache.peek(addr("10.0.0.1")), Slot::Empty);
    }

    #[test]
    fn test_set_reports_displaced_binding() {
        let cache = store();
        assert_eq!(cache.set(addr(A), addr("132.68.0.2"), true), None);
        assert_eq!(cache.set(addr(A), addr("132.68.0.5"), false), None);
        assert_eq!(
            cache.set(addr(A_COLLIDER), addr("132.68.0.3"), false),
            Some(Binding::new(addr(A), addr("132.68.0.5")))
        );
    }

    #[test]
    fn test_clear_and_stats() {
        let cache = CacheStore::new(16, false).unwrap();
        cache.set(addr("10.0.0.1"), addr("132.68.0.1"), true);
        cache.set(addr("10.0.0.2"), addr("132.68.0.2"), false);
        cache.set(addr("10.0.0.3"), addr("132.68.0.3"), false);
        cache.invalidate(addr("10.0.0.3"));

        let stats = cache.stats();
        assert_eq!(stats.capacity, 16);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.invalidated, 1);
        assert_eq!(stats.empty, 13);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.empty, 16);
        assert_eq!(stats.valid, 0);
    }

    #[test]
    fn test_concurrent_disjoint_slots() {
        let cache = Arc::new(CacheStore::new(16, false).unwrap());
        // Slots 14, 4, 2 and 1 respectively.
        let keys = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"];

        let handles: Vec<_> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let cache = Arc::clone(&cache);
                let key = addr(key);
                thread::spawn(move || {
                    for n in 0..1000u16 {
                        let value = Ipv4Addr::new(132, 68, i as u8, (n % 250) as u8);
                        cache.set(key, value, false);
                        assert_eq!(cache.lookup(key), Some(value));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.stats().valid, 4);
    }
}
