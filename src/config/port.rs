//! Port and forwarding configuration (`ports`, `forwarding.*`).

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::engine::PortClass;
use crate::transport::PortId;

/// Default port MTU (Ethernet).
const DEFAULT_PORT_MTU: u16 = 1500;

/// One switch port, backed by a UDP socket exchanging raw frames with a
/// single peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortConfig {
    /// Port number used by the forwarding table (`id`).
    pub id: PortId,

    /// What the port faces (`class`). Defaults to `access`.
    #[serde(default)]
    pub class: PortClass,

    /// Local socket address (`bind_addr`).
    pub bind_addr: String,

    /// Remote socket address frames are sent to (`peer_addr`).
    pub peer_addr: String,

    /// Largest frame the port sends or expects (`mtu`). Defaults to 1500.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u16>,
}

impl PortConfig {
    pub fn new(id: PortId, class: PortClass, bind_addr: &str, peer_addr: &str) -> Self {
        Self {
            id,
            class,
            bind_addr: bind_addr.to_string(),
            peer_addr: peer_addr.to_string(),
            mtu: None,
        }
    }

    /// Get the MTU, using default if not configured.
    pub fn mtu(&self) -> u16 {
        self.mtu.unwrap_or(DEFAULT_PORT_MTU)
    }
}

/// Static forwarding table (`forwarding.*`).
///
/// ```yaml
/// forwarding:
///   routes:
///     "132.68.0.2": 0
///     "132.68.0.3": 1
///   default_port: 1
///   mirror_port: 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardingConfig {
    /// Exact-match physical destination to egress port (`forwarding.routes`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub routes: BTreeMap<Ipv4Addr, PortId>,

    /// Port used when no route matches (`forwarding.default_port`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port: Option<PortId>,

    /// Port that mirrored control packets leave on (`forwarding.mirror_port`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_port: Option<PortId>,
}

impl ForwardingConfig {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.default_port.is_none() && self.mirror_port.is_none()
    }

    /// Routes in `other` are added, replacing any for the same destination.
    pub fn merge(&mut self, other: ForwardingConfig) {
        self.routes.extend(other.routes);
        if other.default_port.is_some() {
            self.default_port = other.default_port;
        }
        if other.mirror_port.is_some() {
            self.mirror_port = other.mirror_port;
        }
    }
}
