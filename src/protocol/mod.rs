//! SwitchV2P Wire Format
//!
//! Frames are IP-in-IP packets. The outer IPv4 header carries the physical
//! addresses used for hop-by-hop forwarding; the inner header carries the
//! virtual addresses and is marked with a reserved protocol number. A fixed
//! 10-byte cache header follows the inner header and drives the coherence
//! protocol between switches.
//!
//! ## Packet types
//!
//! - `Data`: ordinary traffic, possibly still addressed to a gateway.
//! - `Tag`: traffic carrying a piggybacked invalidation.
//! - `Evict`: traffic (or a header-only copy) carrying a displaced binding
//!   toward the next tier.
//! - `Invalidate`: header-only invalidation sent to the stale holder.
//! - `Learn`: authoritative binding push.

mod envelope;
mod error;
mod header;

pub use envelope::{
    ipv4_checksum, Ipv4Header, Packet, DEFAULT_TTL, FRAME_OVERHEAD, IPIP_PROTOCOL,
    IPV4_HEADER_SIZE, MAX_PAYLOAD, V2P_PROTOCOL,
};
pub use error::ProtocolError;
pub use header::{PacketType, V2pHeader, EMPTY_KEY, NO_KEY, V2P_HEADER_SIZE};
