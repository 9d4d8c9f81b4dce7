//! DATA and TAG handling.
//!
//! Traffic is learned from, resolved against the cache when still addressed
//! to a gateway, and checked for misdelivery. A TAG carries an invalidation
//! for every switch on its path and is otherwise treated as DATA.

use std::time::Instant;

use crate::engine::{Engine, Output, Outputs, PortClass};
use crate::protocol::{Packet, PacketType, V2pHeader, NO_KEY};
use tracing::{debug, trace};

impl Engine {
    pub(in crate::engine) fn handle_traffic(
        &self,
        mut packet: Packet,
        ingress: PortClass,
        now: Instant,
    ) -> Outputs {
        let is_tag = packet.header.packet_type == PacketType::Tag;
        if is_tag {
            let key = if packet.header.key == NO_KEY {
                packet.virtual_dst()
            } else {
                packet.header.key
            };
            self.apply_invalidation(key);
        }

        let spill = if self.policy.source_learning && ingress == PortClass::Access {
            self.learn_source(&packet)
        } else {
            None
        };

        if !is_tag && self.policy.misdelivery_detection && self.is_foreign(packet.physical_src()) {
            return self.handle_misdelivery(packet, spill, now);
        }

        if self.policy.destination_learning
            && packet.header.packet_type == PacketType::Data
            && packet.header.key == NO_KEY
            && !self.is_gateway(packet.physical_dst())
        {
            let outcome = self.cache.insert_with_policy(
                packet.virtual_dst(),
                packet.physical_dst(),
                self.policy.access_bit_protection,
            );
            trace!(
                switch = %self.identity,
                key = %packet.virtual_dst(),
                value = %packet.physical_dst(),
                outcome = ?outcome,
                "Destination learning"
            );
            self.apply_insert_outcome(&mut packet.header, outcome);
        }

        self.resolve(&mut packet);
        Outputs::forward(packet).with_generated(self.emit_spill(spill))
    }

    /// Learn `virtual_src -> physical_src`. A displaced binding becomes a
    /// header-only EVICT copy of the carrier, returned for spilling.
    fn learn_source(&self, packet: &Packet) -> Option<Output> {
        let key = packet.virtual_src();
        let value = packet.physical_src();
        let displaced = self.cache.set(key, value, false);
        self.stats.record_learned();
        trace!(switch = %self.identity, key = %key, value = %value, "Source learning");

        let evicted = displaced?;
        if !self.policy.spillover {
            return None;
        }
        let header = V2pHeader::new(
            PacketType::Evict,
            packet.header.origin,
            evicted.key,
            evicted.value,
        );
        Some(Output::forward(packet.derive(header)))
    }

    fn emit_spill(&self, spill: Option<Output>) -> Option<Output> {
        let spill = spill?;
        self.stats.record_eviction_spilled();
        trace!(
            switch = %self.identity,
            key = %spill.packet.header.key,
            value = %spill.packet.header.value,
            "Spilling binding displaced by source learning"
        );
        Some(spill)
    }

    /// Resolve a gateway-bound packet from the cache.
    ///
    /// A hit rewrites the physical destination and stamps this switch's id
    /// as the origin, so a later misdelivery can be traced back here.
    pub(in crate::engine) fn resolve(&self, packet: &mut Packet) {
        if !self.is_gateway(packet.physical_dst()) {
            return;
        }
        match self.cache.lookup(packet.virtual_dst()) {
            Some(physical) => {
                self.stats.record_hit();
                trace!(
                    switch = %self.identity,
                    vdst = %packet.virtual_dst(),
                    pdst = %physical,
                    "Cache hit"
                );
                packet.set_physical_dst(physical);
                packet.header.origin = self.identity.id;
            }
            None => {
                self.stats.record_miss();
                trace!(switch = %self.identity, vdst = %packet.virtual_dst(), "Cache miss");
            }
        }
    }

    /// Forward a misdelivered packet toward the gateway as TAG, and tell the
    /// resolving switch to drop its stale binding unless that was done
    /// within the suppression window.
    ///
    /// The INVALIDATE takes the generated slot ahead of a source-learning
    /// spill; a spill only goes out when the INVALIDATE is suppressed.
    fn handle_misdelivery(&self, mut packet: Packet, spill: Option<Output>, now: Instant) -> Outputs {
        self.stats.record_misdelivery();
        let stale = packet.virtual_dst();
        let origin = packet.header.origin;

        packet.header = V2pHeader::new(PacketType::Tag, origin, stale, NO_KEY);
        if !self.is_gateway(packet.physical_dst())
            && let Some(&gateway) = self.gateways.first()
        {
            packet.set_physical_dst(gateway);
        }

        let generated = if self.pending.should_send(origin, now) {
            self.stats.record_invalidation_sent();
            debug!(
                switch = %self.identity,
                origin = origin,
                key = %stale,
                psrc = %packet.physical_src(),
                "Misdelivery detected, sending invalidation"
            );
            if let Some(dropped) = &spill {
                self.stats.record_spill_dropped();
                debug!(
                    switch = %self.identity,
                    key = %dropped.packet.header.key,
                    "Spill dropped in favor of invalidation"
                );
            }
            let mut invalidate =
                packet.derive(V2pHeader::new(PacketType::Invalidate, origin, stale, NO_KEY));
            invalidate.set_physical_dst(NO_KEY);
            Some(Output::mirror(invalidate))
        } else {
            self.stats.record_invalidation_suppressed();
            debug!(
                switch = %self.identity,
                origin = origin,
                key = %stale,
                "Misdelivery detected, invalidation pending"
            );
            self.emit_spill(spill)
        };

        Outputs::forward(packet).with_generated(generated)
    }
}
