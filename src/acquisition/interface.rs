//! Interface state reader: classifies raw OS addresses into a snapshot.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use crate::platform::{RawAddress, SystemOps};
use crate::types::{
    is_global_v6, is_link_local_v6, is_unique_local_v6, is_usable_v4, InterfaceId,
    InterfaceSnapshot,
};

/// Reads per-interface addressing. Never fails: a missing address type is
/// `None` in the snapshot.
#[derive(Clone)]
pub struct InterfaceStateReader {
    system: Arc<dyn SystemOps>,
}

impl InterfaceStateReader {
    pub fn new(system: Arc<dyn SystemOps>) -> Self {
        Self { system }
    }

    pub async fn read(&self, interface: &InterfaceId) -> InterfaceSnapshot {
        let raw = self.system.interface_addresses(&interface.device).await;
        classify_addresses(interface.clone(), &raw)
    }
}

/// Build a snapshot from raw addresses.
///
/// Link-local IPv6 is always dropped; fc00::/7 goes to the ULA slot; IPv4
/// loopback and 169.254/16 are treated as absent. When several global
/// addresses exist a stable one is preferred over temporary or deprecated ones.
pub fn classify_addresses(interface: InterfaceId, raw: &[RawAddress]) -> InterfaceSnapshot {
    let mut globals: Vec<&RawAddress> = Vec::new();
    let mut unique_local: Option<Ipv6Addr> = None;
    let mut ipv4: Option<Ipv4Addr> = None;

    for entry in raw {
        match entry.addr {
            IpAddr::V6(v6) => {
                if is_link_local_v6(&v6) {
                    continue;
                }
                if is_unique_local_v6(&v6) {
                    if unique_local.is_none() {
                        unique_local = Some(v6);
                    }
                } else if is_global_v6(&v6) {
                    globals.push(entry);
                }
            }
            IpAddr::V4(v4) => {
                if ipv4.is_none() && is_usable_v4(&v4) {
                    ipv4 = Some(v4);
                }
            }
        }
    }

    InterfaceSnapshot {
        interface,
        global_ipv6: preferred_global(&globals),
        unique_local_ipv6: unique_local,
        ipv4,
    }
}

fn preferred_global(globals: &[&RawAddress]) -> Option<Ipv6Addr> {
    let as_v6 = |r: &&RawAddress| match r.addr {
        IpAddr::V6(v6) => Some(v6),
        IpAddr::V4(_) => None,
    };
    globals
        .iter()
        .find(|r| !r.temporary && !r.deprecated)
        .or_else(|| globals.iter().find(|r| !r.deprecated))
        .or_else(|| globals.first())
        .and_then(as_v6)
}
