//! Small shared helpers: the slot hash and IPv4 prefix matching.

pub mod crc;
pub mod prefix;

pub use crc::addr_hash;
pub use prefix::{Ipv4Prefix, PrefixError};
