//! SwitchV2P cache header.
//!
//! Carried after the inner (virtual) IPv4 header of every SwitchV2P frame.
//!
//! ```text
//! [type:1][origin_switch_id:1][key:4 BE][value:4 BE]
//! ```

use super::ProtocolError;
use std::fmt;
use std::net::Ipv4Addr;

/// Size of the encoded cache header.
pub const V2P_HEADER_SIZE: usize = 10;

/// Key/value placeholder for headers that carry no binding.
pub const NO_KEY: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Key marker for an upstream notification whose install displaced nothing.
///
/// Only ever appears on the wire; cache slots use an explicit state instead.
pub const EMPTY_KEY: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

// ============================================================================
// Packet Types
// ============================================================================

/// SwitchV2P packet type identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Ordinary traffic.
    Data = 0x00,
    /// Traffic carrying a piggybacked invalidation for `key`.
    Tag = 0x01,
    /// Spillover notification: `key`/`value` was displaced downstream.
    Evict = 0x02,
    /// Standalone invalidation addressed to the stale binding holder.
    Invalidate = 0x03,
    /// Authoritative binding push from the control plane.
    Learn = 0x04,
}

impl PacketType {
    /// Try to convert from a byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(PacketType::Data),
            0x01 => Some(PacketType::Tag),
            0x02 => Some(PacketType::Evict),
            0x03 => Some(PacketType::Invalidate),
            0x04 => Some(PacketType::Learn),
            _ => None,
        }
    }

    /// Convert to a byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::Data => "Data",
            PacketType::Tag => "Tag",
            PacketType::Evict => "Evict",
            PacketType::Invalidate => "Invalidate",
            PacketType::Learn => "Learn",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Header
// ============================================================================

/// Decoded SwitchV2P cache header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct V2pHeader {
    /// Packet type.
    pub packet_type: PacketType,
    /// Switch that resolved (or generated) this packet.
    pub origin: u8,
    /// Virtual address the header refers to.
    pub key: Ipv4Addr,
    /// Physical address bound to `key`.
    pub value: Ipv4Addr,
}

impl V2pHeader {
    /// A plain DATA header with no binding attached.
    pub fn data() -> Self {
        Self {
            packet_type: PacketType::Data,
            origin: 0,
            key: NO_KEY,
            value: NO_KEY,
        }
    }

    /// A header of the given type carrying `key -> value`.
    pub fn new(packet_type: PacketType, origin: u8, key: Ipv4Addr, value: Ipv4Addr) -> Self {
        Self {
            packet_type,
            origin,
            key,
            value,
        }
    }

    /// Whether the key field holds the "nothing displaced" marker.
    pub fn is_empty_marker(&self) -> bool {
        self.key == EMPTY_KEY
    }

    /// Encode into `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.packet_type.to_byte());
        buf.push(self.origin);
        buf.extend_from_slice(&self.key.octets());
        buf.extend_from_slice(&self.value.octets());
    }

    /// Encode to a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(V2P_HEADER_SIZE);
        self.encode_into(&mut buf);
        buf
    }

    /// Decode from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < V2P_HEADER_SIZE {
            return Err(ProtocolError::MessageTooShort {
                expected: V2P_HEADER_SIZE,
                got: data.len(),
            });
        }

        let packet_type =
            PacketType::from_byte(data[0]).ok_or(ProtocolError::InvalidPacketType(data[0]))?;
        let origin = data[1];
        let key = Ipv4Addr::new(data[2], data[3], data[4], data[5]);
        let value = Ipv4Addr::new(data[6], data[7], data[8], data[9]);

        Ok(Self {
            packet_type,
            origin,
            key,
            value,
        })
    }
}

impl Default for V2pHeader {
    fn default() -> Self {
        Self::data()
    }
}

impl fmt::Display for V2pHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(origin={}, key={}, value={})",
            self.packet_type, self.origin, self.key, self.value
        )
    }
}
