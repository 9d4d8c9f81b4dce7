//! Daemon runtime settings (`node.*`).

use serde::{Deserialize, Serialize};

/// Runtime settings for the switch daemon (`node.*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// RX loop maintenance tick period in milliseconds (`node.tick_interval_ms`).
    #[serde(default = "NodeConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the channel carrying received frames to the RX loop
    /// (`node.packet_channel`).
    #[serde(default = "NodeConfig::default_packet_channel")]
    pub packet_channel: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            packet_channel: 1024,
        }
    }
}

impl NodeConfig {
    fn default_tick_interval_ms() -> u64 { 1000 }
    fn default_packet_channel() -> usize { 1024 }

    /// Take every value in `other` that differs from its default.
    pub fn merge(&mut self, other: NodeConfig) {
        if other.tick_interval_ms != Self::default_tick_interval_ms() {
            self.tick_interval_ms = other.tick_interval_ms;
        }
        if other.packet_channel != Self::default_packet_channel() {
            self.packet_channel = other.packet_channel;
        }
    }
}
