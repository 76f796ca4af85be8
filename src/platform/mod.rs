//! OS collaborators: address and route queries, interface reconfiguration,
//! and reachability echo.
//!
//! The engine talks to the operating system only through [`SystemOps`].
//! Every method absorbs tool failures: a query that cannot run yields empty
//! data, a reconfiguration that cannot run yields a failed [`CommandOutput`].

pub mod command;
pub mod linux;
pub mod macos;

pub use command::{run_command, CommandError, CommandOutput};
pub use linux::LinuxSystem;
pub use macos::MacOsSystem;

use async_trait::async_trait;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

/// One address as reported by the OS for an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAddress {
    pub addr: IpAddr,
    pub prefix_len: Option<u8>,
    /// Privacy (temporary) address
    pub temporary: bool,
    /// Preferred lifetime expired
    pub deprecated: bool,
}

impl RawAddress {
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix_len: None,
            temporary: false,
            deprecated: false,
        }
    }
}

/// IPv6 default route record as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRoute {
    pub gateway: Ipv6Addr,
    pub device: String,
}

/// Consumed OS contracts.
#[async_trait]
pub trait SystemOps: Send + Sync {
    /// Addresses configured on `device`; empty when unavailable.
    async fn interface_addresses(&self, device: &str) -> Vec<RawAddress>;

    /// First IPv6 default route record, or `None`.
    async fn default_route(&self) -> Option<RawRoute>;

    /// Turn IPv6 off for the interface addressed by `service`.
    async fn disable_ipv6(&self, service: &str) -> CommandOutput;

    /// Switch `service` to automatic (SLAAC/RA) configuration.
    async fn set_ipv6_automatic(&self, service: &str) -> CommandOutput;

    /// Pin `service` to a manual address, prefix length and gateway.
    async fn set_ipv6_manual(
        &self,
        service: &str,
        address: Ipv6Addr,
        prefix_len: u8,
        gateway: Ipv6Addr,
    ) -> CommandOutput;

    /// ICMPv6 echo to `host`; true if any reply arrived.
    async fn echo(&self, host: &str, count: u32, timeout: Duration) -> bool;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Pick the backend for the compile target.
pub fn detect() -> Arc<dyn SystemOps> {
    if cfg!(target_os = "macos") {
        Arc::new(MacOsSystem::new())
    } else {
        Arc::new(LinuxSystem::new())
    }
}

/// Strip a `%scope` suffix (`fe80::1%en0`) and parse as IPv6.
pub fn parse_scoped_v6(token: &str) -> Option<Ipv6Addr> {
    token.split('%').next().and_then(|s| s.parse().ok())
}

/// Parse `addr`, `addr/len` or `addr%scope` into an IP and optional length.
pub(crate) fn parse_address_token(token: &str) -> Option<(IpAddr, Option<u8>)> {
    let (addr_part, len_part) = match token.split_once('/') {
        Some((a, l)) => (a, Some(l)),
        None => (token, None),
    };
    let addr_part = addr_part.split('%').next().unwrap_or(addr_part);
    let addr: IpAddr = addr_part.parse().ok()?;
    let len = len_part.and_then(|l| l.parse::<u8>().ok());
    Some((addr, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scope_suffix() {
        assert_eq!(parse_scoped_v6("fe80::1%en0"), Some("fe80::1".parse().unwrap()));
        assert_eq!(parse_scoped_v6("fe80::1"), Some("fe80::1".parse().unwrap()));
        assert_eq!(parse_scoped_v6("link#4"), None);
    }

    #[test]
    fn parses_address_tokens() {
        let (addr, len) = parse_address_token("2001:db8::5/64").unwrap();
        assert_eq!(addr, "2001:db8::5".parse::<IpAddr>().unwrap());
        assert_eq!(len, Some(64));

        let (addr, len) = parse_address_token("fe80::1%eth0").unwrap();
        assert_eq!(addr, "fe80::1".parse::<IpAddr>().unwrap());
        assert_eq!(len, None);

        assert!(parse_address_token("garbage").is_none());
    }
}
