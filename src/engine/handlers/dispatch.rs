//! Packet dispatch by cache header type.

use std::net::Ipv4Addr;
use std::time::Instant;

use crate::cache::{Displaced, InsertOutcome};
use crate::engine::{Engine, Outputs, PortClass};
use crate::protocol::{Packet, PacketType, ProtocolError, V2pHeader, EMPTY_KEY, NO_KEY};
use tracing::{debug, trace};

impl Engine {
    /// Process one decoded packet arriving on a port of class `ingress`.
    pub fn process(&self, packet: Packet, ingress: PortClass, now: Instant) -> Outputs {
        self.stats.record_processed();
        trace!(
            switch = %self.identity,
            header = %packet.header,
            vsrc = %packet.virtual_src(),
            vdst = %packet.virtual_dst(),
            pdst = %packet.physical_dst(),
            ingress = %ingress,
            "Processing packet"
        );

        match packet.header.packet_type {
            PacketType::Data | PacketType::Tag => self.handle_traffic(packet, ingress, now),
            PacketType::Evict => self.handle_evict(packet),
            PacketType::Invalidate => {
                self.handle_invalidate(&packet);
                Outputs::none()
            }
            PacketType::Learn => {
                self.handle_learn(&packet);
                Outputs::none()
            }
        }
    }

    /// Decode and process a raw frame.
    ///
    /// A frame that fails to decode is counted and dropped without touching
    /// switch state.
    pub fn process_bytes(
        &self,
        data: &[u8],
        ingress: PortClass,
        now: Instant,
    ) -> Result<Outputs, ProtocolError> {
        let packet = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.record_malformed();
                debug!(switch = %self.identity, len = data.len(), error = %e, "Dropping malformed frame");
                return Err(e);
            }
        };
        Ok(self.process(packet, ingress, now))
    }

    /// Count an insert and, with spillover, rewrite `header` to carry its
    /// result to the next tier.
    ///
    /// An eviction turns the header into EVICT for the displaced binding; an
    /// install into a vacant slot marks the key as [`EMPTY_KEY`]. Refreshes
    /// and refusals leave the header as it was.
    pub(in crate::engine) fn apply_insert_outcome(
        &self,
        header: &mut V2pHeader,
        outcome: InsertOutcome,
    ) {
        match outcome {
            InsertOutcome::Installed(displaced) => {
                self.stats.record_learned();
                if !self.policy.spillover {
                    return;
                }
                match displaced {
                    Displaced::Evicted(binding) => {
                        self.stats.record_eviction_spilled();
                        trace!(switch = %self.identity, evicted = %binding, "Spilling evicted binding");
                        header.packet_type = PacketType::Evict;
                        header.key = binding.key;
                        header.value = binding.value;
                    }
                    Displaced::Vacant => {
                        header.key = EMPTY_KEY;
                        header.value = NO_KEY;
                    }
                    Displaced::Refreshed => {}
                }
            }
            InsertOutcome::Refused(occupant) => {
                self.stats.record_refusal();
                trace!(switch = %self.identity, occupant = %occupant, "Install refused by active binding");
            }
        }
    }

    /// Invalidate `key` locally, counting it if a binding was removed.
    pub(in crate::engine) fn apply_invalidation(&self, key: Ipv4Addr) {
        if self.cache.invalidate(key) {
            self.stats.record_invalidation_applied();
            debug!(switch = %self.identity, key = %key, "Invalidated binding");
        }
    }
}
