//! Coherence Engine
//!
//! Per-packet decision logic for one switch. The engine owns the switch's
//! cache, its pending-invalidation table and its counters, and turns each
//! decoded packet into zero, one or two output packets: the (possibly
//! rewritten) original and at most one generated control packet.
//!
//! Behavior differs by topology tier only through [`RolePolicy`], resolved
//! once at construction. All processing goes through `&self`; the cache
//! locks per slot and the pending table locks per check-and-arm, so an
//! `Engine` can be shared across threads behind an `Arc`.

mod handlers;
mod retransmit;
mod role;
mod stats;

#[cfg(test)]
mod tests;

use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, CacheStore, DEFAULT_CACHE_CAPACITY};
use crate::protocol::Packet;
use crate::utils::Ipv4Prefix;

pub use retransmit::{PendingInvalidations, DEFAULT_RETRANSMIT_TIMEOUT_MS, MAX_RETRANSMIT_TIMEOUT};
pub use role::{PolicyOverrides, Role, RolePolicy, SwitchIdentity};
pub use stats::{StatsSnapshot, SwitchStats};

// ============================================================================
// Ports and Outputs
// ============================================================================

/// What a port faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortClass {
    /// Hosts (or the tier below).
    #[default]
    Access,
    /// The next tier up.
    Uplink,
    /// The gateways.
    Gateway,
}

impl fmt::Display for PortClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortClass::Access => "access",
            PortClass::Uplink => "uplink",
            PortClass::Gateway => "gateway",
        };
        write!(f, "{}", s)
    }
}

/// How an output leaves the switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Egress {
    /// Route by the packet's physical destination.
    Forward,
    /// Send out the access-facing mirror port.
    Mirror,
}

/// One packet leaving the switch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub packet: Packet,
    pub egress: Egress,
}

impl Output {
    pub fn forward(packet: Packet) -> Self {
        Self {
            packet,
            egress: Egress::Forward,
        }
    }

    pub fn mirror(packet: Packet) -> Self {
        Self {
            packet,
            egress: Egress::Mirror,
        }
    }
}

/// Result of processing one packet: the original (unless consumed) and at
/// most one generated control packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outputs {
    /// The processed packet, if it continues.
    pub primary: Option<Output>,
    /// A control packet generated while processing.
    pub generated: Option<Output>,
}

impl Outputs {
    /// The packet was consumed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Forward the processed packet only.
    pub fn forward(packet: Packet) -> Self {
        Self {
            primary: Some(Output::forward(packet)),
            generated: None,
        }
    }

    /// Attach a generated control packet.
    pub fn with_generated(mut self, generated: Option<Output>) -> Self {
        self.generated = generated;
        self
    }

    pub fn len(&self) -> usize {
        self.primary.is_some() as usize + self.generated.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.generated.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.primary.iter().chain(self.generated.iter())
    }
}

impl IntoIterator for Outputs {
    type Item = Output;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Option<Output>, 2>>;

    fn into_iter(self) -> Self::IntoIter {
        [self.primary, self.generated].into_iter().flatten()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Construction parameters for an [`Engine`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub identity: SwitchIdentity,
    pub policy: RolePolicy,
    /// Physical addresses that mark a packet as unresolved.
    pub gateways: Vec<Ipv4Addr>,
    /// Physical source prefixes that mark a packet as misdelivered.
    pub foreign_prefixes: Vec<Ipv4Prefix>,
    pub cache_capacity: usize,
    pub second_chance: bool,
    pub retransmit_timeout: Duration,
}

impl EngineConfig {
    /// Defaults for a role, with the role's policy.
    pub fn new(role: Role, id: u8) -> Self {
        Self {
            identity: SwitchIdentity::new(role, id),
            policy: RolePolicy::for_role(role),
            gateways: Vec::new(),
            foreign_prefixes: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            second_chance: false,
            retransmit_timeout: Duration::from_millis(DEFAULT_RETRANSMIT_TIMEOUT_MS),
        }
    }

    pub fn with_gateways(mut self, gateways: Vec<Ipv4Addr>) -> Self {
        self.gateways = gateways;
        self
    }

    pub fn with_foreign_prefixes(mut self, prefixes: Vec<Ipv4Prefix>) -> Self {
        self.foreign_prefixes = prefixes;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_second_chance(mut self, enabled: bool) -> Self {
        self.second_chance = enabled;
        self
    }

    pub fn with_retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.retransmit_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: RolePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Per-switch coherence engine.
#[derive(Debug)]
pub struct Engine {
    identity: SwitchIdentity,
    policy: RolePolicy,
    gateways: Vec<Ipv4Addr>,
    foreign_prefixes: Vec<Ipv4Prefix>,
    cache: CacheStore,
    pending: PendingInvalidations,
    stats: SwitchStats,
}

impl Engine {
    /// Create an engine with an empty cache.
    pub fn new(config: EngineConfig) -> Result<Self, CacheError> {
        let cache = CacheStore::new(config.cache_capacity, config.second_chance)?;
        Ok(Self {
            identity: config.identity,
            policy: config.policy,
            gateways: config.gateways,
            foreign_prefixes: config.foreign_prefixes,
            cache,
            pending: PendingInvalidations::new(config.retransmit_timeout),
            stats: SwitchStats::new(),
        })
    }

    pub fn identity(&self) -> SwitchIdentity {
        self.identity
    }

    pub fn policy(&self) -> RolePolicy {
        self.policy
    }

    pub fn gateways(&self) -> &[Ipv4Addr] {
        &self.gateways
    }

    /// The switch's cache, for inspection and control-plane resets.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Pending misdelivery invalidations.
    pub fn pending(&self) -> &PendingInvalidations {
        &self.pending
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Current invalidation suppression window.
    pub fn retransmit_timeout(&self) -> Duration {
        self.pending.timeout()
    }

    /// Change the invalidation suppression window while running.
    pub fn set_retransmit_timeout(&self, timeout: Duration) {
        self.pending.set_timeout(timeout);
    }

    /// Drop expired pending invalidations. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        self.pending.cleanup(now)
    }

    /// Whether `addr` is a gateway address (the packet is unresolved).
    pub fn is_gateway(&self, addr: Ipv4Addr) -> bool {
        self.gateways.contains(&addr)
    }

    /// Whether `addr` lies in a foreign prefix (the packet is misdelivered).
    pub fn is_foreign(&self, addr: Ipv4Addr) -> bool {
        self.foreign_prefixes.iter().any(|p| p.contains(addr))
    }
}
