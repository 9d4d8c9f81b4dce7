//! Switch roles and the per-role coherence policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a switch in the topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Top-of-rack switch facing hosts.
    #[default]
    Tor,
    /// Top-of-rack switch facing the gateways.
    GwTor,
    /// Aggregation switch.
    Spine,
    /// Aggregation switch on the gateway side.
    GwSpine,
    /// Core switch; the topmost tier.
    Core,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Tor => "tor",
            Role::GwTor => "gw_tor",
            Role::Spine => "spine",
            Role::GwSpine => "gw_spine",
            Role::Core => "core",
        };
        write!(f, "{}", s)
    }
}

/// Who this switch is. Fixed at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwitchIdentity {
    pub role: Role,
    pub id: u8,
}

impl SwitchIdentity {
    pub fn new(role: Role, id: u8) -> Self {
        Self { role, id }
    }
}

impl fmt::Display for SwitchIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.role, self.id)
    }
}

/// Role-derived behavior switches, resolved once so the packet path never
/// branches on role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RolePolicy {
    /// Learn `virtual_src -> physical_src` from traffic entering on access ports.
    pub source_learning: bool,
    /// Learn `virtual_dst -> physical_dst` from already-resolved traffic.
    pub destination_learning: bool,
    /// Refuse to displace a recently used binding.
    pub access_bit_protection: bool,
    /// Push displaced bindings to the next tier.
    pub spillover: bool,
    /// Detect misdelivered traffic and invalidate the resolving switch.
    pub misdelivery_detection: bool,
}

impl RolePolicy {
    /// Default policy for a role.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Tor => Self {
                source_learning: true,
                destination_learning: false,
                access_bit_protection: false,
                spillover: true,
                misdelivery_detection: true,
            },
            Role::GwTor => Self {
                source_learning: false,
                destination_learning: true,
                access_bit_protection: false,
                spillover: true,
                misdelivery_detection: false,
            },
            Role::Spine | Role::GwSpine => Self {
                source_learning: false,
                destination_learning: true,
                access_bit_protection: true,
                spillover: true,
                misdelivery_detection: false,
            },
            Role::Core => Self {
                source_learning: false,
                destination_learning: true,
                access_bit_protection: true,
                spillover: false,
                misdelivery_detection: false,
            },
        }
    }

    /// Apply configured per-flag overrides.
    pub fn with_overrides(mut self, overrides: &PolicyOverrides) -> Self {
        if let Some(v) = overrides.source_learning {
            self.source_learning = v;
        }
        if let Some(v) = overrides.destination_learning {
            self.destination_learning = v;
        }
        if let Some(v) = overrides.access_bit_protection {
            self.access_bit_protection = v;
        }
        if let Some(v) = overrides.spillover {
            self.spillover = v;
        }
        if let Some(v) = overrides.misdelivery_detection {
            self.misdelivery_detection = v;
        }
        self
    }
}

impl From<Role> for RolePolicy {
    fn from(role: Role) -> Self {
        Self::for_role(role)
    }
}

/// Per-flag policy overrides (`switch.policy.*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_learning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_learning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_bit_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spillover: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misdelivery_detection: Option<bool>,
}

impl PolicyOverrides {
    /// Whether no flag is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Take every flag `other` sets.
    pub fn merge(&mut self, other: PolicyOverrides) {
        self.source_learning = other.source_learning.or(self.source_learning);
        self.destination_learning = other.destination_learning.or(self.destination_learning);
        self.access_bit_protection = other.access_bit_protection.or(self.access_bit_protection);
        self.spillover = other.spillover.or(self.spillover);
        self.misdelivery_detection = other.misdelivery_detection.or(self.misdelivery_detection);
    }
}
