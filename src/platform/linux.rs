//! Linux backend: iproute2 for queries, NetworkManager (`nmcli`) for
//! reconfiguration, iputils `ping` for echo.

use async_trait::async_trait;
use std::net::Ipv6Addr;
use std::time::Duration;

use super::command::{run_lenient, CommandOutput, DEFAULT_COMMAND_TIMEOUT};
use super::{parse_address_token, parse_scoped_v6, RawAddress, RawRoute, SystemOps};

const IP: &str = "ip";
const NMCLI: &str = "nmcli";
const PING: &str = "ping";

#[derive(Debug, Default, Clone)]
pub struct LinuxSystem;

impl LinuxSystem {
    pub fn new() -> Self {
        Self
    }

    /// Apply `ipv6.*` settings to a connection profile and re-activate it.
    async fn modify_and_activate(&self, service: &str, settings: &[&str]) -> CommandOutput {
        let mut args = vec!["connection", "modify", service];
        args.extend_from_slice(settings);
        let modify = run_lenient(NMCLI, &args, DEFAULT_COMMAND_TIMEOUT).await;
        if !modify.success {
            return modify;
        }
        let up = run_lenient(NMCLI, &["connection", "up", service], DEFAULT_COMMAND_TIMEOUT).await;
        CommandOutput {
            success: up.success,
            stdout: format!("{}{}", modify.stdout, up.stdout),
            stderr: format!("{}{}", modify.stderr, up.stderr),
        }
    }
}

#[async_trait]
impl SystemOps for LinuxSystem {
    async fn interface_addresses(&self, device: &str) -> Vec<RawAddress> {
        let out = run_lenient(IP, &["-o", "addr", "show", "dev", device], DEFAULT_COMMAND_TIMEOUT).await;
        if !out.success {
            return Vec::new();
        }
        parse_ip_addr(&out.stdout)
    }

    async fn default_route(&self) -> Option<RawRoute> {
        let out = run_lenient(IP, &["-6", "route", "show", "default"], DEFAULT_COMMAND_TIMEOUT).await;
        if !out.success {
            return None;
        }
        parse_ip_route_default(&out.stdout)
    }

    async fn disable_ipv6(&self, service: &str) -> CommandOutput {
        self.modify_and_activate(service, &["ipv6.method", "disabled"]).await
    }

    async fn set_ipv6_automatic(&self, service: &str) -> CommandOutput {
        self.modify_and_activate(
            service,
            &["ipv6.method", "auto", "ipv6.addresses", "", "ipv6.gateway", ""],
        )
        .await
    }

    async fn set_ipv6_manual(
        &self,
        service: &str,
        address: Ipv6Addr,
        prefix_len: u8,
        gateway: Ipv6Addr,
    ) -> CommandOutput {
        let cidr = format!("{address}/{prefix_len}");
        let gateway = gateway.to_string();
        self.modify_and_activate(
            service,
            &["ipv6.method", "manual", "ipv6.addresses", &cidr, "ipv6.gateway", &gateway],
        )
        .await
    }

    async fn echo(&self, host: &str, count: u32, timeout: Duration) -> bool {
        let count = count.max(1);
        // Overall bound: one wait per packet plus slack.
        let bound = timeout * (count + 1);
        let count = count.to_string();
        let wait = timeout.as_secs().max(1).to_string();
        run_lenient(PING, &["-6", "-c", &count, "-W", &wait, host], bound)
            .await
            .success
    }

    fn backend_name(&self) -> &'static str {
        "linux"
    }
}

/// Parse `ip -o addr show dev <device>` output.
pub fn parse_ip_addr(output: &str) -> Vec<RawAddress> {
    let mut addresses = Vec::new();
    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(pos) = tokens.iter().position(|t| *t == "inet" || *t == "inet6") else {
            continue;
        };
        let Some((addr, prefix_len)) = tokens.get(pos + 1).and_then(|t| parse_address_token(t)) else {
            continue;
        };
        addresses.push(RawAddress {
            addr,
            prefix_len,
            temporary: tokens.contains(&"temporary"),
            deprecated: tokens.contains(&"deprecated"),
        });
    }
    addresses
}

/// Parse `ip -6 route show default`, including multipath `nexthop` records.
pub fn parse_ip_route_default(output: &str) -> Option<RawRoute> {
    let mut lines = output.lines().peekable();
    while let Some(line) = lines.next() {
        if !line.starts_with("default") {
            continue;
        }
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        // Continuation lines of the same record are indented.
        while let Some(next) = lines.peek() {
            if next.starts_with(char::is_whitespace) {
                tokens.extend(next.split_whitespace());
                lines.next();
            } else {
                break;
            }
        }
        let gateway = value_after(&tokens, "via").and_then(parse_scoped_v6);
        let device = value_after(&tokens, "dev");
        if let (Some(gateway), Some(device)) = (gateway, device) {
            return Some(RawRoute {
                gateway,
                device: device.to_string(),
            });
        }
    }
    None
}

fn value_after<'a>(tokens: &[&'a str], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| *t == key)
        .and_then(|i| tokens.get(i + 1))
        .copied()
}
