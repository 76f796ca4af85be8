//! Interface repairer: renews the primary interface's IPv6 configuration
//! and pins it to manual mode once a valid address and route are back.
//!
//! ```text
//! 1. IPv6 off -> automatic, wait `settle`
//! 2. re-read primary global address + default route
//! 3. no address, or route not on primary -> stay automatic ("renewed-automatic")
//! 4. manual(address, /64, gateway)                       ("set-manual")
//! ```
//!
//! The sequence always runs to completion once started. The secondary
//! interface is never touched.

use serde::Serialize;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use super::activity::ActivityLog;
use crate::acquisition::{InterfaceStateReader, RouteStateReader};
use crate::platform::{CommandOutput, SystemOps};
use crate::types::{InterfaceId, PREFIX_LENGTH};

/// Why a repair stopped at automatic mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InconclusiveReason {
    NoGlobalAddress,
    NoDefaultRoute,
    RouteOnOtherInterface { device: String },
}

impl std::fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InconclusiveReason::NoGlobalAddress => write!(f, "no global address acquired"),
            InconclusiveReason::NoDefaultRoute => write!(f, "no default route acquired"),
            InconclusiveReason::RouteOnOtherInterface { device } => {
                write!(f, "default route belongs to {device}")
            }
        }
    }
}

/// Result of one repair sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RepairOutcome {
    /// Left in automatic mode; not necessarily fixed, but no worse
    RenewedAutomatic { reason: InconclusiveReason },
    /// Pinned to a manual configuration
    SetManual {
        address: Ipv6Addr,
        prefix_len: u8,
        gateway: Ipv6Addr,
    },
}

impl RepairOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RepairOutcome::RenewedAutomatic { .. } => "renewed-automatic",
            RepairOutcome::SetManual { .. } => "set-manual",
        }
    }
}

impl std::fmt::Display for RepairOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairOutcome::RenewedAutomatic { reason } => write!(f, "renewed-automatic ({reason})"),
            RepairOutcome::SetManual {
                address,
                prefix_len,
                gateway,
            } => write!(f, "set-manual ({address}/{prefix_len} via {gateway})"),
        }
    }
}

/// Executes the repair sequence on the primary interface.
pub struct InterfaceRepairer {
    system: Arc<dyn SystemOps>,
    interfaces: InterfaceStateReader,
    routes: RouteStateReader,
    primary: InterfaceId,
    settle: Duration,
    log: Arc<ActivityLog>,
}

impl InterfaceRepairer {
    pub fn new(
        system: Arc<dyn SystemOps>,
        primary: InterfaceId,
        settle: Duration,
        log: Arc<ActivityLog>,
    ) -> Self {
        Self {
            interfaces: InterfaceStateReader::new(Arc::clone(&system)),
            routes: RouteStateReader::new(Arc::clone(&system)),
            system,
            primary,
            settle,
            log,
        }
    }

    pub fn primary(&self) -> &InterfaceId {
        &self.primary
    }

    pub async fn repair(&self) -> RepairOutcome {
        let service = self.primary.service.as_str();
        self.log.info(format!("Repair: renewing IPv6 on {}", self.primary));

        let out = self.system.disable_ipv6(service).await;
        self.log_step("IPv6 off", &out);
        let out = self.system.set_ipv6_automatic(service).await;
        self.log_step("IPv6 automatic", &out);

        self.log.info(format!(
            "Repair: waiting {}s for router advertisement",
            self.settle.as_secs()
        ));
        tokio::time::sleep(self.settle).await;

        let snapshot = self.interfaces.read(&self.primary).await;
        let route = self.routes.current_default_route().await;

        let Some(address) = snapshot.global_ipv6 else {
            return self.stay_automatic(InconclusiveReason::NoGlobalAddress);
        };
        self.log.info(format!("Repair: acquired {address} on {}", self.primary));

        let Some(route) = route else {
            return self.stay_automatic(InconclusiveReason::NoDefaultRoute);
        };
        if !route.is_owned_by(&self.primary) {
            return self.stay_automatic(InconclusiveReason::RouteOnOtherInterface {
                device: route.out_interface,
            });
        }
        self.log.info(format!(
            "Repair: default route via {} on {}",
            route.gateway, route.out_interface
        ));

        let out = self
            .system
            .set_ipv6_manual(service, address, PREFIX_LENGTH, route.gateway)
            .await;
        self.log_step("IPv6 manual", &out);

        let outcome = RepairOutcome::SetManual {
            address,
            prefix_len: PREFIX_LENGTH,
            gateway: route.gateway,
        };
        self.log.info(format!("Repair finished: {outcome}"));
        outcome
    }

    fn stay_automatic(&self, reason: InconclusiveReason) -> RepairOutcome {
        let outcome = RepairOutcome::RenewedAutomatic { reason };
        self.log.warn(format!(
            "Repair inconclusive: {outcome}; leaving {} in automatic mode",
            self.primary
        ));
        outcome
    }

    fn log_step(&self, step: &str, out: &CommandOutput) {
        let text = out.text();
        match (out.success, text.is_empty()) {
            (true, true) => self.log.info(format!("Repair: {step} ok")),
            (true, false) => self.log.info(format!("Repair: {step} ok: {text}")),
            (false, true) => self.log.warn(format!("Repair: {step} failed")),
            (false, false) => self.log.warn(format!("Repair: {step} failed: {text}")),
        }
    }
}
