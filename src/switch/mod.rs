//! Switch Daemon
//!
//! Hosts one software switch: a coherence [`Engine`], the UDP ports that
//! stand in for its physical ports, and the static forwarding table that
//! picks an egress port for every packet the engine emits.

mod forwarding;
mod lifecycle;
mod rx_loop;


use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::{Config, ConfigError};
use crate::engine::{Engine, SwitchIdentity};
use crate::transport::{PacketRx, PacketTx, PortId, TransportError, UdpPort};

pub use forwarding::ForwardingTable;

/// Errors related to switch operations.
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("switch not started")]
    NotStarted,

    #[error("switch already started")]
    AlreadyStarted,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("port {port} failed: {source}")]
    Port {
        port: PortId,
        source: TransportError,
    },
}

/// Switch lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SwitchState {
    /// Created but not started.
    #[default]
    Created,
    /// Binding ports.
    Starting,
    /// Ports up, ready to run the receive loop.
    Running,
    /// Shutting down.
    Stopping,
    /// Stopped.
    Stopped,
}

impl SwitchState {
    /// Check if the switch is operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, SwitchState::Running)
    }

    /// Check if the switch can be started.
    pub fn can_start(&self) -> bool {
        matches!(self, SwitchState::Created | SwitchState::Stopped)
    }

    /// Check if the switch can be stopped.
    pub fn can_stop(&self) -> bool {
        matches!(self, SwitchState::Running)
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchState::Created => "created",
            SwitchState::Starting => "starting",
            SwitchState::Running => "running",
            SwitchState::Stopping => "stopping",
            SwitchState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// A running software switch.
pub struct Switch {
    /// Validated configuration.
    config: Config,
    /// Cache and coherence state.
    engine: Engine,
    /// Egress selection.
    forwarding: ForwardingTable,
    /// Lifecycle state.
    state: SwitchState,
    /// Started ports by id.
    ports: BTreeMap<PortId, UdpPort>,
    /// Sender half of the frame channel, cloned into every port.
    packet_tx: Option<PacketTx>,
    /// Receiver half, taken by the receive loop.
    packet_rx: Option<PacketRx>,
}

impl Switch {
    /// Create a switch from a configuration. Ports are bound by `start()`.
    pub fn new(config: Config) -> Result<Self, SwitchError> {
        config.validate()?;
        let engine = Engine::new(config.engine_config())?;
        let forwarding = ForwardingTable::from_config(&config.forwarding);
        Ok(Self {
            config,
            engine,
            forwarding,
            state: SwitchState::Created,
            ports: BTreeMap::new(),
            packet_tx: None,
            packet_rx: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    pub fn identity(&self) -> SwitchIdentity {
        self.engine.identity()
    }

    /// The switch's engine, for inspection and control-plane access.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn forwarding(&self) -> &ForwardingTable {
        &self.forwarding
    }

    /// A started port by id.
    pub fn port(&self, id: PortId) -> Option<&UdpPort> {
        self.ports.get(&id)
    }

    /// Number of started ports.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }
}
