//! Network state types: InterfaceSnapshot, RouteInfo, Prefix

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Fixed prefix length used for every manual configuration.
pub const PREFIX_LENGTH: u8 = 64;

// ============================================================================
// Interface Identity
// ============================================================================

/// A tracked network interface.
///
/// `device` is the kernel name (`en0`, `eth0`) used for address queries and
/// route ownership. `service` is the name the reconfiguration tool expects
/// (`Ethernet` for networksetup, the connection name for nmcli).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceId {
    pub device: String,
    pub service: String,
}

impl InterfaceId {
    pub fn new(device: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            service: service.into(),
        }
    }

    /// Interface whose reconfiguration name equals its device name.
    pub fn device_only(device: impl Into<String>) -> Self {
        let device = device.into();
        Self {
            service: device.clone(),
            device,
        }
    }
}

impl std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.device == self.service {
            write!(f, "{}", self.device)
        } else {
            write!(f, "{} ({})", self.service, self.device)
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Addressing of one interface at the moment of a check.
///
/// Built fresh on every check and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
    pub interface: InterfaceId,
    pub global_ipv6: Option<Ipv6Addr>,
    pub unique_local_ipv6: Option<Ipv6Addr>,
    pub ipv4: Option<Ipv4Addr>,
}

impl InterfaceSnapshot {
    /// Snapshot with no addresses of any kind.
    pub fn empty(interface: InterfaceId) -> Self {
        Self {
            interface,
            global_ipv6: None,
            unique_local_ipv6: None,
            ipv4: None,
        }
    }

    /// Prefix of the global address, if one exists.
    pub fn prefix(&self) -> Option<Prefix> {
        self.global_ipv6.map(Prefix::of)
    }

    pub fn has_global(&self) -> bool {
        self.global_ipv6.is_some()
    }

    pub fn has_unique_local(&self) -> bool {
        self.unique_local_ipv6.is_some()
    }
}

/// The current IPv6 default route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Gateway with any `%scope` suffix already stripped.
    pub gateway: Ipv6Addr,
    /// Device that owns the route.
    pub out_interface: String,
}

impl RouteInfo {
    pub fn is_owned_by(&self, interface: &InterfaceId) -> bool {
        self.out_interface == interface.device
    }
}

// ============================================================================
// Prefix
// ============================================================================

/// Network portion of a global IPv6 address: its first four 16-bit groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prefix([u16; 4]);

impl Prefix {
    pub fn of(addr: Ipv6Addr) -> Self {
        let s = addr.segments();
        Self([s[0], s[1], s[2], s[3]])
    }

    pub fn groups(&self) -> [u16; 4] {
        self.0
    }

    /// Parse the form produced by `Display` (`2001:db8:1:1::/64`) or a bare
    /// address, keeping only the first four groups.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let addr = trimmed.split('/').next().unwrap_or(trimmed);
        addr.parse::<Ipv6Addr>().ok().map(Self::of)
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:x}:{b:x}:{c:x}:{d:x}::/{PREFIX_LENGTH}")
    }
}

// ============================================================================
// Address classification
// ============================================================================

/// fe80::/10
pub fn is_link_local_v6(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// fc00::/7 (fc00::/8 and fd00::/8)
pub fn is_unique_local_v6(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

/// An address that can carry internet traffic: not loopback, unspecified,
/// multicast, link-local or unique-local.
pub fn is_global_v6(addr: &Ipv6Addr) -> bool {
    !(addr.is_loopback()
        || addr.is_unspecified()
        || addr.is_multicast()
        || is_link_local_v6(addr)
        || is_unique_local_v6(addr))
}

/// IPv4 addresses worth reporting: excludes loopback and 169.254/16.
pub fn is_usable_v4(addr: &Ipv4Addr) -> bool {
    !(addr.is_loopback() || addr.is_link_local() || addr.is_unspecified())
}
