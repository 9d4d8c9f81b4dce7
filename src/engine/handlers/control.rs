//! INVALIDATE and LEARN handling. Both are consumed by the receiving switch.

use crate::engine::Engine;
use crate::protocol::Packet;
use tracing::debug;

impl Engine {
    pub(in crate::engine) fn handle_invalidate(&self, packet: &Packet) {
        self.apply_invalidation(packet.header.key);
    }

    /// Authoritative binding push. Overwrites whatever the slot holds; a
    /// displaced binding is dropped locally without propagation.
    pub(in crate::engine) fn handle_learn(&self, packet: &Packet) {
        let key = packet.header.key;
        let value = packet.header.value;
        let displaced = self.cache.set(key, value, false);
        self.stats.record_learned();
        match displaced {
            Some(binding) => debug!(
                switch = %self.identity,
                key = %key,
                value = %value,
                displaced = %binding,
                "Learned binding, displaced entry dropped"
            ),
            None => debug!(switch = %self.identity, key = %key, value = %value, "Learned binding"),
        }
    }
}
