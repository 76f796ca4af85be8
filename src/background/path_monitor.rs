//! Connectivity-change trigger.
//!
//! `PathMonitor` polls the tracked interfaces and reduces them to a coarse
//! `PathStatus`, sending each change over an mpsc channel. `run_path_trigger`
//! consumes that stream and, on every transition into `Satisfied`, waits for
//! addressing to settle and then runs a check.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::acquisition::InterfaceStateReader;
use crate::pipeline::{CheckCoordinator, Trigger};
use crate::platform::SystemOps;
use crate::types::{InterfaceId, InterfaceSnapshot};

/// Coarse network path status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    /// Some tracked interface has a usable address
    Satisfied,
    Unsatisfied,
    /// Reachable only after a connection is brought up (on-demand links)
    RequiresConnection,
}

impl std::fmt::Display for PathStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathStatus::Satisfied => write!(f, "satisfied"),
            PathStatus::Unsatisfied => write!(f, "unsatisfied"),
            PathStatus::RequiresConnection => write!(f, "requires-connection"),
        }
    }
}

/// Satisfied when any snapshot holds a usable non-link-local address.
pub fn path_status(snapshots: &[InterfaceSnapshot]) -> PathStatus {
    let usable = snapshots.iter().any(|s| {
        s.global_ipv6.is_some() || s.unique_local_ipv6.is_some() || s.ipv4.is_some()
    });
    if usable {
        PathStatus::Satisfied
    } else {
        PathStatus::Unsatisfied
    }
}

/// Polling path monitor over the tracked interfaces.
pub struct PathMonitor {
    interfaces: InterfaceStateReader,
    tracked: Vec<InterfaceId>,
    poll: Duration,
}

impl PathMonitor {
    pub fn new(system: Arc<dyn SystemOps>, tracked: Vec<InterfaceId>, poll: Duration) -> Self {
        Self {
            interfaces: InterfaceStateReader::new(system),
            tracked,
            poll,
        }
    }

    pub async fn current_status(&self) -> PathStatus {
        let mut snapshots = Vec::with_capacity(self.tracked.len());
        for interface in &self.tracked {
            snapshots.push(self.interfaces.read(interface).await);
        }
        path_status(&snapshots)
    }

    /// Poll until cancelled or the receiver is dropped. The first reading
    /// is a baseline and is not sent.
    pub async fn run(self, tx: mpsc::Sender<PathStatus>, cancel: CancellationToken) {
        let mut last = self.current_status().await;
        info!(status = %last, poll_secs = self.poll.as_secs(), "Path monitor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Path monitor stopped");
                    return;
                }
                _ = tokio::time::sleep(self.poll) => {}
            }

            let current = self.current_status().await;
            if current == last {
                continue;
            }
            info!(from = %last, to = %current, "Network path changed");
            last = current;
            if tx.send(current).await.is_err() {
                debug!("Path channel closed, stopping monitor");
                return;
            }
        }
    }
}

/// React to path changes: after each transition into `Satisfied`, wait
/// `delay` and run a check.
pub async fn run_path_trigger(
    coordinator: Arc<CheckCoordinator>,
    mut rx: mpsc::Receiver<PathStatus>,
    delay: Duration,
    cancel: CancellationToken,
) {
    let mut last: Option<PathStatus> = None;

    loop {
        let status = tokio::select! {
            _ = cancel.cancelled() => return,
            status = rx.recv() => match status {
                Some(status) => status,
                None => return,
            },
        };

        let entered_satisfied = status == PathStatus::Satisfied && last != Some(PathStatus::Satisfied);
        last = Some(status);
        if !entered_satisfied {
            continue;
        }

        coordinator
            .activity_log()
            .info(format!("Network path satisfied, checking in {}s", delay.as_secs()));
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        let outcome = coordinator.check(Trigger::PathChange, true).await;
        debug!(?outcome, "Path change check finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(device: &str) -> InterfaceSnapshot {
        InterfaceSnapshot::empty(InterfaceId::device_only(device))
    }

    #[test]
    fn no_addresses_is_unsatisfied() {
        assert_eq!(path_status(&[snapshot("en0"), snapshot("en1")]), PathStatus::Unsatisfied);
        assert_eq!(path_status(&[]), PathStatus::Unsatisfied);
    }

    #[test]
    fn any_usable_address_is_satisfied() {
        let mut with_v4 = snapshot("en1");
        with_v4.ipv4 = Some("192.168.1.4".parse().unwrap());
        assert_eq!(path_status(&[snapshot("en0"), with_v4]), PathStatus::Satisfied);

        let mut with_ula = snapshot("en0");
        with_ula.unique_local_ipv6 = Some("fd00::1".parse().unwrap());
        assert_eq!(path_status(&[with_ula]), PathStatus::Satisfied);
    }
}
