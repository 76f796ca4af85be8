//! macOS backend: `ifconfig`, `netstat`, `networksetup`, `ping6`.

use async_trait::async_trait;
use std::net::Ipv6Addr;
use std::time::Duration;

use super::command::{run_lenient, CommandOutput, DEFAULT_COMMAND_TIMEOUT};
use super::{parse_address_token, parse_scoped_v6, RawAddress, RawRoute, SystemOps};

const IFCONFIG: &str = "/sbin/ifconfig";
const NETSTAT: &str = "/usr/sbin/netstat";
const NETWORKSETUP: &str = "/usr/sbin/networksetup";
const PING6: &str = "/sbin/ping6";

#[derive(Debug, Default, Clone)]
pub struct MacOsSystem;

impl MacOsSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SystemOps for MacOsSystem {
    async fn interface_addresses(&self, device: &str) -> Vec<RawAddress> {
        let out = run_lenient(IFCONFIG, &[device], DEFAULT_COMMAND_TIMEOUT).await;
        if !out.success {
            return Vec::new();
        }
        parse_ifconfig(&out.stdout)
    }

    async fn default_route(&self) -> Option<RawRoute> {
        let out = run_lenient(NETSTAT, &["-rn", "-f", "inet6"], DEFAULT_COMMAND_TIMEOUT).await;
        if !out.success {
            return None;
        }
        parse_netstat_default(&out.stdout)
    }

    async fn disable_ipv6(&self, service: &str) -> CommandOutput {
        run_lenient(NETWORKSETUP, &["-setv6off", service], DEFAULT_COMMAND_TIMEOUT).await
    }

    async fn set_ipv6_automatic(&self, service: &str) -> CommandOutput {
        run_lenient(NETWORKSETUP, &["-setv6automatic", service], DEFAULT_COMMAND_TIMEOUT).await
    }

    async fn set_ipv6_manual(
        &self,
        service: &str,
        address: Ipv6Addr,
        prefix_len: u8,
        gateway: Ipv6Addr,
    ) -> CommandOutput {
        let address = address.to_string();
        let prefix_len = prefix_len.to_string();
        let gateway = gateway.to_string();
        run_lenient(
            NETWORKSETUP,
            &["-setv6manual", service, &address, &prefix_len, &gateway],
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await
    }

    async fn echo(&self, host: &str, count: u32, timeout: Duration) -> bool {
        let count = count.max(1).to_string();
        run_lenient(PING6, &["-c", &count, host], timeout).await.success
    }

    fn backend_name(&self) -> &'static str {
        "macos"
    }
}

/// Parse `ifconfig <device>` output into addresses.
///
/// Recognises `inet6 <addr>[%scope] prefixlen N [flags...]` and
/// `inet <addr> netmask ...` lines.
pub fn parse_ifconfig(output: &str) -> Vec<RawAddress> {
    let mut addresses = Vec::new();
    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&family) = tokens.first() else {
            continue;
        };
        if family != "inet6" && family != "inet" {
            continue;
        }
        let Some((addr, _)) = tokens.get(1).and_then(|t| parse_address_token(t)) else {
            continue;
        };
        let prefix_len = tokens
            .iter()
            .position(|t| *t == "prefixlen")
            .and_then(|i| tokens.get(i + 1))
            .and_then(|t| t.parse::<u8>().ok());
        addresses.push(RawAddress {
            addr,
            prefix_len,
            temporary: tokens.contains(&"temporary"),
            deprecated: tokens.contains(&"deprecated"),
        });
    }
    addresses
}

/// Parse `netstat -rn -f inet6` and return the first usable default route.
pub fn parse_netstat_default(output: &str) -> Option<RawRoute> {
    output.lines().find_map(|line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() != Some(&"default") || tokens.len() < 4 {
            return None;
        }
        let gateway = parse_scoped_v6(tokens[1])?;
        Some(RawRoute {
            gateway,
            device: tokens[3].to_string(),
        })
    })
}
