//! Route state reader: the current IPv6 default route.

use std::sync::Arc;

use crate::platform::SystemOps;
use crate::types::RouteInfo;

/// Reads the IPv6 default route. `None` is a normal state (no RA received).
#[derive(Clone)]
pub struct RouteStateReader {
    system: Arc<dyn SystemOps>,
}

impl RouteStateReader {
    pub fn new(system: Arc<dyn SystemOps>) -> Self {
        Self { system }
    }

    pub async fn current_default_route(&self) -> Option<RouteInfo> {
        // Backends already strip the %scope suffix so the gateway can be
        // handed straight to a manual configuration.
        self.system.default_route().await.map(|raw| RouteInfo {
            gateway: raw.gateway,
            out_interface: raw.device,
        })
    }
}
