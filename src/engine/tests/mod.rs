use super::*;
use crate::cache::Slot;
use crate::protocol::{PacketType, V2pHeader, EMPTY_KEY, NO_KEY};

mod misdelivery;

pub(super) const GATEWAY: &str = "132.68.0.3";
pub(super) const FOREIGN_SRC: &str = "133.68.0.2";

pub(super) fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

pub(super) fn make_engine(role: Role, id: u8) -> Engine {
    Engine::new(engine_config(role, id)).unwrap()
}

pub(super) fn engine_config(role: Role, id: u8) -> EngineConfig {
    EngineConfig::new(role, id)
        .with_gateways(vec![addr(GATEWAY)])
        .with_foreign_prefixes(vec!["133.68.0.0/16".parse().unwrap()])
}

/// Packet builder with the defaults the scenarios share.
pub(super) struct PacketBuilder {
    physical_src: Ipv4Addr,
    physical_dst: Ipv4Addr,
    virtual_src: Ipv4Addr,
    virtual_dst: Ipv4Addr,
    header: V2pHeader,
    payload: usize,
}

impl PacketBuilder {
    pub(super) fn new() -> Self {
        Self {
            physical_src: addr("132.68.0.1"),
            physical_dst: addr("132.68.0.2"),
            virtual_src: addr("10.0.0.1"),
            virtual_dst: addr("10.0.0.2"),
            header: V2pHeader::data(),
            payload: 0,
        }
    }

    pub(super) fn psrc(mut self, a: &str) -> Self {
        self.physical_src = addr(a);
        self
    }

    pub(super) fn pdst(mut self, a: &str) -> Self {
        self.physical_dst = addr(a);
        self
    }

    pub(super) fn vsrc(mut self, a: &str) -> Self {
        self.virtual_src = addr(a);
        self
    }

    pub(super) fn vdst(mut self, a: &str) -> Self {
        self.virtual_dst = addr(a);
        self
    }

    pub(super) fn header(mut self, t: PacketType, origin: u8, key: &str, value: &str) -> Self {
        self.header = V2pHeader::new(t, origin, addr(key), addr(value));
        self
    }

    pub(super) fn origin(mut self, origin: u8) -> Self {
        self.header.origin = origin;
        self
    }

    pub(super) fn payload(mut self, len: usize) -> Self {
        self.payload = len;
        self
    }

    pub(super) fn build(self) -> Packet {
        Packet::new(
            self.physical_src,
            self.physical_dst,
            self.virtual_src,
            self.virtual_dst,
            self.header,
            vec![b'x'; self.payload],
        )
    }
}

pub(super) fn packet() -> PacketBuilder {
    PacketBuilder::new()
}
