//! SwitchV2P: in-network virtual-to-physical address caching
//!
//! Every switch on the forwarding path keeps a small direct-mapped cache of
//! virtual→physical bindings. Switches learn bindings from the traffic they
//! forward, resolve gateway-bound packets from their cache, and keep caches
//! across tiers coherent with in-band EVICT, TAG, INVALIDATE and LEARN
//! messages.

pub mod cache;
pub mod config;
pub mod engine;
pub mod protocol;
pub mod switch;
pub mod transport;
pub mod utils;

// Re-export config types
pub use config::{
    CacheConfig, Config, ConfigError, ForwardingConfig, NodeConfig, PortConfig, SwitchConfig,
};

// Re-export cache types
pub use cache::{Binding, CacheError, CacheStats, CacheStore, Displaced, InsertOutcome, Slot};

// Re-export engine types
pub use engine::{
    Egress, Engine, EngineConfig, Output, Outputs, PendingInvalidations, PolicyOverrides,
    PortClass, Role, RolePolicy, StatsSnapshot, SwitchIdentity,
};

// Re-export protocol types
pub use protocol::{Packet, PacketType, ProtocolError, V2pHeader, EMPTY_KEY, NO_KEY};

// Re-export transport types
pub use transport::{
    packet_channel, PacketRx, PacketTx, PortId, PortState, ReceivedFrame, TransportError, UdpPort,
};

// Re-export switch types
pub use switch::{ForwardingTable, Switch, SwitchError, SwitchState};

// Re-export utility types
pub use utils::{Ipv4Prefix, PrefixError};
