//! Static egress selection.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::config::ForwardingConfig;
use crate::engine::{Egress, Output};
use crate::transport::PortId;

/// Maps physical destinations to egress ports.
///
/// Routes are exact matches on the outer destination address. Packets with
/// no matching route take the default port when one is configured;
/// mirrored control packets always take the mirror port.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardingTable {
    routes: HashMap<Ipv4Addr, PortId>,
    default_port: Option<PortId>,
    mirror_port: Option<PortId>,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ForwardingConfig) -> Self {
        Self {
            routes: config.routes.iter().map(|(dst, port)| (*dst, *port)).collect(),
            default_port: config.default_port,
            mirror_port: config.mirror_port,
        }
    }

    /// Add or replace the route for `dst`.
    pub fn add_route(&mut self, dst: Ipv4Addr, port: PortId) -> Option<PortId> {
        self.routes.insert(dst, port)
    }

    pub fn set_default_port(&mut self, port: Option<PortId>) {
        self.default_port = port;
    }

    pub fn set_mirror_port(&mut self, port: Option<PortId>) {
        self.mirror_port = port;
    }

    pub fn mirror_port(&self) -> Option<PortId> {
        self.mirror_port
    }

    /// Egress port for a physical destination.
    pub fn route(&self, dst: Ipv4Addr) -> Option<PortId> {
        self.routes.get(&dst).copied().or(self.default_port)
    }

    /// Egress port for an engine output.
    pub fn egress_port(&self, output: &Output) -> Option<PortId> {
        match output.egress {
            Egress::Forward => self.route(output.packet.physical_dst()),
            Egress::Mirror => self.mirror_port,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
