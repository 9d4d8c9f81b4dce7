//! EVICT handling.

use crate::engine::{Engine, Outputs};
use crate::protocol::{Packet, PacketType, V2pHeader, NO_KEY};
use tracing::trace;

impl Engine {
    /// Install a binding spilled from the tier below, always deferring to a
    /// recently used occupant.
    ///
    /// With spillover the carrier continues upward, re-tagged with whatever
    /// this install displaced. Without it this is the topmost tier and the
    /// notification ends here: a header-only carrier is consumed, one with a
    /// payload continues as plain DATA.
    pub(in crate::engine) fn handle_evict(&self, mut packet: Packet) -> Outputs {
        let key = packet.header.key;
        if key != NO_KEY && !packet.header.is_empty_marker() {
            let outcome = self.cache.insert_with_policy(key, packet.header.value, true);
            trace!(
                switch = %self.identity,
                key = %key,
                value = %packet.header.value,
                outcome = ?outcome,
                "EVICT install"
            );
            self.apply_insert_outcome(&mut packet.header, outcome);
        }

        if !self.policy.spillover {
            if packet.payload.is_empty() {
                trace!(switch = %self.identity, "EVICT terminated at topmost tier");
                return Outputs::none();
            }
            packet.header = V2pHeader {
                packet_type: PacketType::Data,
                key: NO_KEY,
                value: NO_KEY,
                ..packet.header
            };
        }

        if !packet.payload.is_empty() {
            self.resolve(&mut packet);
        }
        Outputs::forward(packet)
    }
}
