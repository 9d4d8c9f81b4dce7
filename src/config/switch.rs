//! Switch identity and cache configuration (`switch.*`, `cache.*`).

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::engine::{PolicyOverrides, Role, RolePolicy, SwitchIdentity, DEFAULT_RETRANSMIT_TIMEOUT_MS};
use crate::utils::Ipv4Prefix;

/// Switch identity and coherence settings (`switch.*`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchConfig {
    /// Topology role (`switch.role`). Defaults to `tor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Switch id stamped on resolved packets (`switch.id`). Defaults to 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u8>,

    /// Physical addresses of the gateways (`switch.gateways`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateways: Vec<Ipv4Addr>,

    /// Physical source prefixes that indicate misdelivery
    /// (`switch.foreign_prefixes`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_prefixes: Vec<Ipv4Prefix>,

    /// Invalidation suppression window in milliseconds
    /// (`switch.retransmit_timeout_ms`). Defaults to 8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retransmit_timeout_ms: Option<u64>,

    /// Per-flag overrides of the role's policy (`switch.policy.*`).
    #[serde(default, skip_serializing_if = "PolicyOverrides::is_empty")]
    pub policy: PolicyOverrides,
}

impl SwitchConfig {
    /// Get the role, using default if not configured.
    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }

    /// Get the switch id, using default if not configured.
    pub fn id(&self) -> u8 {
        self.id.unwrap_or(0)
    }

    pub fn identity(&self) -> SwitchIdentity {
        SwitchIdentity::new(self.role(), self.id())
    }

    /// The role's policy with configured overrides applied.
    pub fn resolved_policy(&self) -> RolePolicy {
        RolePolicy::for_role(self.role()).with_overrides(&self.policy)
    }

    /// Get the suppression window, using default if not configured.
    pub fn retransmit_timeout(&self) -> Duration {
        Duration::from_millis(
            self.retransmit_timeout_ms
                .unwrap_or(DEFAULT_RETRANSMIT_TIMEOUT_MS),
        )
    }

    /// Merge another switch section into this one.
    ///
    /// Scalars present in `other` override; lists replace when non-empty;
    /// policy overrides merge flag by flag.
    pub fn merge(&mut self, other: SwitchConfig) {
        if other.role.is_some() {
            self.role = other.role;
        }
        if other.id.is_some() {
            self.id = other.id;
        }
        if !other.gateways.is_empty() {
            self.gateways = other.gateways;
        }
        if !other.foreign_prefixes.is_empty() {
            self.foreign_prefixes = other.foreign_prefixes;
        }
        if other.retransmit_timeout_ms.is_some() {
            self.retransmit_timeout_ms = other.retransmit_timeout_ms;
        }
        self.policy.merge(other.policy);
    }
}

/// Cache sizing (`cache.*`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Number of slots (`cache.capacity`). Defaults to 8192.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,

    /// Age a live entry on a colliding miss (`cache.second_chance`).
    /// Defaults to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_chance: Option<bool>,
}

impl CacheConfig {
    /// Get the capacity, using default if not configured.
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    /// Get the second-chance flag, using default if not configured.
    pub fn second_chance(&self) -> bool {
        self.second_chance.unwrap_or(false)
    }

    pub fn merge(&mut self, other: CacheConfig) {
        if other.capacity.is_some() {
            self.capacity = other.capacity;
        }
        if other.second_chance.is_some() {
            self.second_chance = other.second_chance;
        }
    }
}
