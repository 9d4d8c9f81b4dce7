//! Slot hashing.
//!
//! CRC-32 (IEEE) over the address octets, the same value zlib computes, so
//! slot indices match the ones a control plane derives with
//! `zlib.crc32(addr) % N`.

use std::net::Ipv4Addr;

/// CRC-32 of an address's network-order octets.
pub fn addr_hash(addr: Ipv4Addr) -> u32 {
    crc32fast::hash(&addr.octets())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_hash_matches_zlib() {
        assert_eq!(addr_hash(Ipv4Addr::new(10, 0, 0, 1)), 0x39FE_0FEE);
        assert_eq!(addr_hash(Ipv4Addr::new(10, 0, 0, 2)), 0xA0F7_5E54);
        assert_eq!(addr_hash(Ipv4Addr::new(10, 0, 22, 103)), 0x81B7_7E54);
        assert_eq!(addr_hash(Ipv4Addr::BROADCAST), 0xFFFF_FFFF);
    }

    #[test]
    fn test_colliding_addresses() {
        let a = addr_hash(Ipv4Addr::new(10, 0, 0, 2)) % 8192;
        let b = addr_hash(Ipv4Addr::new(10, 0, 22, 103)) % 8192;
        assert_eq!(a, b);
    }
}
