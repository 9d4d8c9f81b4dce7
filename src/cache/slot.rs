//! Cache slot state and insert outcomes.

use std::fmt;
use std::net::Ipv4Addr;

/// A virtual→physical binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Virtual address.
    pub key: Ipv4Addr,
    /// Physical address currently hosting `key`.
    pub value: Ipv4Addr,
}

impl Binding {
    pub fn new(key: Ipv4Addr, value: Ipv4Addr) -> Self {
        Self { key, value }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.key, self.value)
    }
}

/// State of one cache slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Slot {
    /// Never written since startup or the last clear.
    #[default]
    Empty,
    /// Held a binding that has since been invalidated.
    Invalidated,
    /// A live binding.
    Valid {
        key: Ipv4Addr,
        value: Ipv4Addr,
        /// Set on every lookup hit, cleared on (re)install.
        access_bit: bool,
    },
}

impl Slot {
    /// Build a live slot.
    pub fn valid(key: Ipv4Addr, value: Ipv4Addr, access_bit: bool) -> Self {
        Slot::Valid {
            key,
            value,
            access_bit,
        }
    }

    /// Whether the slot holds a live binding.
    pub fn is_valid(&self) -> bool {
        matches!(self, Slot::Valid { .. })
    }

    /// The live binding, if any.
    pub fn binding(&self) -> Option<Binding> {
        match *self {
            Slot::Valid { key, value, .. } => Some(Binding { key, value }),
            _ => None,
        }
    }

    /// The live key, if any.
    pub fn key(&self) -> Option<Ipv4Addr> {
        self.binding().map(|b| b.key)
    }

    /// Whether the slot holds `key` as a live binding.
    pub fn holds(&self, key: Ipv4Addr) -> bool {
        self.key() == Some(key)
    }

    /// Whether the slot is live and recently used.
    pub fn is_active(&self) -> bool {
        matches!(self, Slot::Valid { access_bit: true, .. })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => write!(f, "empty"),
            Slot::Invalidated => write!(f, "invalidated"),
            Slot::Valid {
                key,
                value,
                access_bit,
            } => write!(
                f,
                "{}->{}{}",
                key,
                value,
                if *access_bit { " (active)" } else { "" }
            ),
        }
    }
}

/// What an install replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Displaced {
    /// The slot was empty or invalidated.
    Vacant,
    /// The slot already held the same key; its value was overwritten.
    Refreshed,
    /// A live binding for a different key was removed.
    Evicted(Binding),
}

/// Result of a policy-checked insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The binding was written.
    Installed(Displaced),
    /// An active occupant with a different key kept the slot.
    Refused(Binding),
}

impl InsertOutcome {
    /// Whether the binding was written.
    pub fn installed(&self) -> bool {
        matches!(self, InsertOutcome::Installed(_))
    }

    /// The live binding this insert removed, if any.
    pub fn evicted(&self) -> Option<Binding> {
        match self {
            InsertOutcome::Installed(Displaced::Evicted(b)) => Some(*b),
            _ => None,
        }
    }
}
