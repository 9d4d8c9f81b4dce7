//! Dual-addressed IPv4 envelope.
//!
//! A SwitchV2P frame is an IP-in-IP packet. The outer header carries the
//! physical (routable) addresses used hop by hop; the inner header carries
//! the virtual addresses being resolved and is marked with a reserved
//! transport protocol number.
//!
//! ```text
//! [outer IPv4:20, proto=4][inner IPv4:20, proto=146][v2p header:10][payload]
//! ```

use super::header::{V2pHeader, V2P_HEADER_SIZE};
use super::ProtocolError;
use std::net::Ipv4Addr;

/// Protocol number of the outer header (IP-in-IP).
pub const IPIP_PROTOCOL: u8 = 4;

/// Reserved protocol number marking a SwitchV2P inner header.
pub const V2P_PROTOCOL: u8 = 146;

/// Size of an option-less IPv4 header.
pub const IPV4_HEADER_SIZE: usize = 20;

/// Bytes preceding the payload of an encoded frame.
pub const FRAME_OVERHEAD: usize = 2 * IPV4_HEADER_SIZE + V2P_HEADER_SIZE;

/// Largest payload an encoded frame can carry.
pub const MAX_PAYLOAD: usize = u16::MAX as usize - FRAME_OVERHEAD;

/// Default TTL for locally built headers.
pub const DEFAULT_TTL: u8 = 64;

// ============================================================================
// IPv4 Header
// ============================================================================

/// The IPv4 header fields a switch preserves across decode/encode.
///
/// Lengths and the checksum are recomputed on encode; options are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Type of service / DSCP+ECN byte.
    pub tos: u8,
    /// Identification field.
    pub identification: u16,
    /// Flags and fragment offset.
    pub flags_fragment: u16,
    /// Time to live.
    pub ttl: u8,
    /// Transport protocol number.
    pub protocol: u8,
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Create a header with default TOS, id, flags and TTL.
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8) -> Self {
        Self {
            tos: 0,
            identification: 0,
            flags_fragment: 0,
            ttl: DEFAULT_TTL,
            protocol,
            src,
            dst,
        }
    }

    /// Parse a header, returning it with its header length and the total
    /// length the header declares.
    fn parse(data: &[u8]) -> Result<(Self, usize, usize), ProtocolError> {
        if data.len() < IPV4_HEADER_SIZE {
            return Err(ProtocolError::MessageTooShort {
                expected: IPV4_HEADER_SIZE,
                got: data.len(),
            });
        }

        let version = data[0] >> 4;
        if version != 4 {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let header_len = (data[0] & 0x0F) as usize * 4;
        if header_len < IPV4_HEADER_SIZE {
            return Err(ProtocolError::Malformed(format!(
                "IPv4 header length {} below minimum",
                header_len
            )));
        }
        if data.len() < header_len {
            return Err(ProtocolError::MessageTooShort {
                expected: header_len,
                got: data.len(),
            });
        }

        let total_len = u16::from_be_bytes([data[2], data[3]]) as usize;
        if total_len < header_len || total_len > data.len() {
            return Err(ProtocolError::Malformed(format!(
                "IPv4 total length {} inconsistent with {} available bytes",
                total_len,
                data.len()
            )));
        }

        let header = Self {
            tos: data[1],
            identification: u16::from_be_bytes([data[4], data[5]]),
            flags_fragment: u16::from_be_bytes([data[6], data[7]]),
            ttl: data[8],
            protocol: data[9],
            src: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            dst: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
        };

        Ok((header, header_len, total_len))
    }

    /// Append an option-less encoding declaring `total_len` bytes.
    fn encode_into(&self, total_len: u16, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.push(0x45);
        buf.push(self.tos);
        buf.extend_from_slice(&total_len.to_be_bytes());
        buf.extend_from_slice(&self.identification.to_be_bytes());
        buf.extend_from_slice(&self.flags_fragment.to_be_bytes());
        buf.push(self.ttl);
        buf.push(self.protocol);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&self.src.octets());
        buf.extend_from_slice(&self.dst.octets());

        let checksum = ipv4_checksum(&buf[start..start + IPV4_HEADER_SIZE]);
        buf[start + 10..start + 12].copy_from_slice(&checksum.to_be_bytes());
    }
}

/// Internet checksum over an IPv4 header.
pub fn ipv4_checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    for chunk in header.chunks(2) {
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum += word as u32;
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

// ============================================================================
// Packet
// ============================================================================

/// A decoded SwitchV2P frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Outer header: physical addresses.
    pub outer: Ipv4Header,
    /// Inner header: virtual addresses.
    pub inner: Ipv4Header,
    /// Cache header.
    pub header: V2pHeader,
    /// Opaque payload following the cache header.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a packet from its four addresses.
    pub fn new(
        physical_src: Ipv4Addr,
        physical_dst: Ipv4Addr,
        virtual_src: Ipv4Addr,
        virtual_dst: Ipv4Addr,
        header: V2pHeader,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            outer: Ipv4Header::new(physical_src, physical_dst, IPIP_PROTOCOL),
            inner: Ipv4Header::new(virtual_src, virtual_dst, V2P_PROTOCOL),
            header,
            payload,
        }
    }

    /// Physical (outer) source address.
    pub fn physical_src(&self) -> Ipv4Addr {
        self.outer.src
    }

    /// Physical (outer) destination address.
    pub fn physical_dst(&self) -> Ipv4Addr {
        self.outer.dst
    }

    /// Rewrite the physical destination.
    pub fn set_physical_dst(&mut self, dst: Ipv4Addr) {
        self.outer.dst = dst;
    }

    /// Virtual (inner) source address.
    pub fn virtual_src(&self) -> Ipv4Addr {
        self.inner.src
    }

    /// Virtual (inner) destination address.
    pub fn virtual_dst(&self) -> Ipv4Addr {
        self.inner.dst
    }

    /// Copy of this packet's envelope with a different header and no payload.
    ///
    /// Control packets generated by a switch are truncated copies of the
    /// packet that triggered them.
    pub fn derive(&self, header: V2pHeader) -> Self {
        Self {
            outer: self.outer,
            inner: self.inner,
            header,
            payload: Vec::new(),
        }
    }

    /// Encoded size in bytes.
    pub fn wire_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::MessageTooLong {
                max: MAX_PAYLOAD,
                got: self.payload.len(),
            });
        }

        let outer_len = self.wire_len() as u16;
        let inner_len = outer_len - IPV4_HEADER_SIZE as u16;

        let mut buf = Vec::with_capacity(self.wire_len());
        self.outer.encode_into(outer_len, &mut buf);
        self.inner.encode_into(inner_len, &mut buf);
        self.header.encode_into(&mut buf);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode from wire format.
    ///
    /// Bytes past the outer header's declared total length (link padding)
    /// are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (outer, outer_hlen, outer_total) = Ipv4Header::parse(data)?;
        if outer.protocol != IPIP_PROTOCOL {
            return Err(ProtocolError::UnexpectedProtocol {
                layer: "outer",
                expected: IPIP_PROTOCOL,
                got: outer.protocol,
            });
        }

        let rest = &data[outer_hlen..outer_total];
        let (inner, inner_hlen, inner_total) = Ipv4Header::parse(rest)?;
        if inner.protocol != V2P_PROTOCOL {
            return Err(ProtocolError::UnexpectedProtocol {
                layer: "inner",
                expected: V2P_PROTOCOL,
                got: inner.protocol,
            });
        }

        let body = &rest[inner_hlen..inner_total];
        let header = V2pHeader::decode(body)?;
        let payload = body[V2P_HEADER_SIZE..].to_vec();

        Ok(Self {
            outer,
            inner,
            header,
            payload,
        })
    }
}
