//! IPv4 prefixes for address classification.
//!
//! Used to describe the "foreign" physical address space whose traffic
//! indicates a misdelivery. Accepts CIDR notation (`133.68.0.0/16`) or a
//! bare address, which is treated as a /32.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing an IPv4 prefix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefixError {
    #[error("invalid address in prefix '{0}'")]
    InvalidAddress(String),

    #[error("invalid prefix length in '{0}' (expected 0-32)")]
    InvalidLength(String),
}

/// An IPv4 network prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Prefix {
    network: Ipv4Addr,
    len: u8,
}

impl Ipv4Prefix {
    /// Create a prefix, masking off host bits.
    pub fn new(addr: Ipv4Addr, len: u8) -> Result<Self, PrefixError> {
        if len > 32 {
            return Err(PrefixError::InvalidLength(format!("{}/{}", addr, len)));
        }
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask(len));
        Ok(Self { network, len })
    }

    /// A prefix matching exactly one address.
    pub fn host(addr: Ipv4Addr) -> Self {
        Self { network: addr, len: 32 }
    }

    /// Network address (host bits cleared).
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Check whether an address falls inside this prefix.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & Self::mask(self.len) == u32::from(self.network)
    }

    fn mask(len: u8) -> u32 {
        match len {
            0 => 0,
            n => u32::MAX << (32 - n as u32),
        }
    }
}

impl FromStr for Ipv4Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_part, len_part) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };

        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| PrefixError::InvalidAddress(s.to_string()))?;

        let Some(len) = len_part else {
            return Ok(Self::host(addr));
        };
        let len = len
            .parse::<u8>()
            .map_err(|_| PrefixError::InvalidLength(s.to_string()))?;

        Self::new(addr, len).map_err(|_| PrefixError::InvalidLength(s.to_string()))
    }
}

impl TryFrom<String> for Ipv4Prefix {
    type Error = PrefixError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Prefix> for String {
    fn from(prefix: Ipv4Prefix) -> Self {
        prefix.to_string()
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let prefix: Ipv4Prefix = "133.68.0.0/16".parse().unwrap();
        assert_eq!(prefix.network(), Ipv4Addr::new(133, 68, 0, 0));
        assert_eq!(prefix.prefix_len(), 16);
        assert!(prefix.contains(Ipv4Addr::new(133, 68, 0, 2)));
        assert!(prefix.contains(Ipv4Addr::new(133, 68, 255, 255)));
        assert!(!prefix.contains(Ipv4Addr::new(132, 68, 0, 2)));
    }

    #[test]
    fn test_parse_bare_address_is_host() {
        let prefix: Ipv4Prefix = "133.68.0.2".parse().unwrap();
        assert_eq!(prefix, Ipv4Prefix::host(Ipv4Addr::new(133, 68, 0, 2)));
        assert!(prefix.contains(Ipv4Addr::new(133, 68, 0, 2)));
        assert!(!prefix.contains(Ipv4Addr::new(133, 68, 0, 3)));
    }

    #[test]
    fn test_host_bits_masked() {
        let prefix: Ipv4Prefix = "10.1.2.3/8".parse().unwrap();
        assert_eq!(prefix.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(prefix.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_zero_length_matches_everything() {
        let prefix: Ipv4Prefix = "0.0.0.0/0".parse().unwrap();
        assert!(prefix.contains(Ipv4Addr::new(1, 2, 3, 4)));
        assert!(prefix.contains(Ipv4Addr::BROADCAST));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "not-an-ip/8".parse::<Ipv4Prefix>(),
            Err(PrefixError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<Ipv4Prefix>(),
            Err(PrefixError::InvalidLength(_))
        ));
        assert!(matches!(
            "10.0.0.0/abc".parse::<Ipv4Prefix>(),
            Err(PrefixError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_serde_yaml_roundtrip_as_string() {
        let prefixes: Vec<Ipv4Prefix> =
            serde_yaml::from_str("- 133.68.0.0/16\n- 200.1.1.1\n").unwrap();
        assert_eq!(prefixes.len(), 2);
        assert_eq!(prefixes[1].prefix_len(), 32);

        let yaml = serde_yaml::to_string(&prefixes).unwrap();
        assert!(yaml.contains("133.68.0.0/16"));
        assert!(yaml.contains("200.1.1.1/32"));
    }
}
