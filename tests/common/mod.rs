//! Shared fakes for integration tests: a scripted `SystemOps` and a
//! scripted connectivity probe.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use ipv6_sentry::acquisition::{ConnectivityProbe, ProbeReport, TargetOutcome, TargetResult};
use ipv6_sentry::pipeline::{ActivityLog, CheckCoordinator, CoordinatorSettings};
use ipv6_sentry::platform::{CommandOutput, RawAddress, RawRoute, SystemOps};
use ipv6_sentry::storage::{MemoryPreferences, PreferenceStore};
use ipv6_sentry::InterfaceId;

pub const PRIMARY: &str = "en0";
pub const SECONDARY: &str = "en1";
pub const PRIMARY_SERVICE: &str = "Ethernet";

// ============================================================================
// Network state
// ============================================================================

/// Addresses per device plus the default route.
#[derive(Debug, Clone, Default)]
pub struct NetState {
    pub addresses: HashMap<String, Vec<RawAddress>>,
    pub route: Option<RawRoute>,
}

impl NetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, device: &str, addr: &str) -> Self {
        let ip: IpAddr = addr.parse().unwrap();
        let mut raw = RawAddress::new(ip);
        raw.prefix_len = Some(if ip.is_ipv6() { 64 } else { 24 });
        self.addresses.entry(device.to_string()).or_default().push(raw);
        self
    }

    pub fn with_route(mut self, gateway: &str, device: &str) -> Self {
        self.route = Some(RawRoute {
            gateway: gateway.parse().unwrap(),
            device: device.to_string(),
        });
        self
    }
}

// ============================================================================
// Fake SystemOps
// ============================================================================

/// Scripted OS. `after_automatic`, when set, replaces the current state the
/// moment IPv6 is switched to automatic (the router answering the renewal).
#[derive(Default)]
pub struct FakeSystem {
    state: Mutex<NetState>,
    after_automatic: Mutex<Option<NetState>>,
    calls: Mutex<Vec<String>>,
    /// (entered, release): `disable_ipv6` signals `entered` then waits on `release`
    disable_gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FakeSystem {
    pub fn new(state: NetState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            ..Default::default()
        })
    }

    pub fn set_state(&self, state: NetState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_after_automatic(&self, state: NetState) {
        *self.after_automatic.lock().unwrap() = Some(state);
    }

    /// Make the next repair block in its first step until `release` is notified.
    pub fn gate_disable(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.disable_gate.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn ok_output() -> CommandOutput {
    CommandOutput {
        success: true,
        stdout: String::new(),
        stderr: String::new(),
    }
}

#[async_trait]
impl SystemOps for FakeSystem {
    async fn interface_addresses(&self, device: &str) -> Vec<RawAddress> {
        let state = self.state.lock().unwrap();
        state.addresses.get(device).cloned().unwrap_or_default()
    }

    async fn default_route(&self) -> Option<RawRoute> {
        self.state.lock().unwrap().route.clone()
    }

    async fn disable_ipv6(&self, service: &str) -> CommandOutput {
        self.record(format!("disable:{service}"));
        let gate = self.disable_gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        ok_output()
    }

    async fn set_ipv6_automatic(&self, service: &str) -> CommandOutput {
        self.record(format!("automatic:{service}"));
        if let Some(next) = self.after_automatic.lock().unwrap().take() {
            *self.state.lock().unwrap() = next;
        }
        ok_output()
    }

    async fn set_ipv6_manual(
        &self,
        service: &str,
        address: Ipv6Addr,
        prefix_len: u8,
        gateway: Ipv6Addr,
    ) -> CommandOutput {
        self.record(format!("manual:{service} {address}/{prefix_len} via {gateway}"));
        ok_output()
    }

    async fn echo(&self, host: &str, _count: u32, _timeout: Duration) -> bool {
        self.record(format!("echo:{host}"));
        false
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

// ============================================================================
// Fake probe
// ============================================================================

/// Scripted reachability: queued results first, then `default`.
pub struct FakeProbe {
    queue: Mutex<VecDeque<bool>>,
    default: AtomicBool,
    calls: AtomicUsize,
    /// (entered, release): the next probe signals `entered` then waits on `release`
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FakeProbe {
    pub fn reachable(default: bool) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            default: AtomicBool::new(default),
            calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
        })
    }

    pub fn queue(&self, results: &[bool]) {
        self.queue.lock().unwrap().extend(results.iter().copied());
    }

    pub fn set_default(&self, reachable: bool) {
        self.default.store(reachable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn gate_next(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }
}

#[async_trait]
impl ConnectivityProbe for FakeProbe {
    async fn probe(&self, _timeout: Duration) -> ProbeReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        let reachable = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.load(Ordering::SeqCst));
        let outcome = if reachable {
            TargetOutcome::Success { status: 200 }
        } else {
            TargetOutcome::Timeout
        };
        ProbeReport {
            targets: vec![TargetResult {
                target: "https://[2606:4700:4700::1111]/".to_string(),
                outcome,
                echo_reachable: if reachable { None } else { Some(false) },
            }],
        }
    }
}

// ============================================================================
// Coordinator harness
// ============================================================================

pub fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        primary: InterfaceId::new(PRIMARY, PRIMARY_SERVICE),
        secondary: InterfaceId::new(SECONDARY, "Wi-Fi"),
        probe_timeout: Duration::from_secs(1),
        cooldown: Duration::from_secs(60),
        settle: Duration::ZERO,
        post_repair_settle: Duration::ZERO,
        auto_fix: true,
    }
}

pub struct Harness {
    pub system: Arc<FakeSystem>,
    pub probe: Arc<FakeProbe>,
    pub prefs: Arc<MemoryPreferences>,
    pub coordinator: Arc<CheckCoordinator>,
}

impl Harness {
    pub fn new(state: NetState, reachable: bool) -> Self {
        Self::with_prefs(state, reachable, Arc::new(MemoryPreferences::new()))
    }

    pub fn with_prefs(state: NetState, reachable: bool, prefs: Arc<MemoryPreferences>) -> Self {
        let system = FakeSystem::new(state);
        let probe = FakeProbe::reachable(reachable);
        let coordinator = Arc::new(CheckCoordinator::new(
            settings(),
            system.clone(),
            probe.clone(),
            prefs.clone() as Arc<dyn PreferenceStore>,
            Arc::new(ActivityLog::new(500)),
        ));
        Self {
            system,
            probe,
            prefs,
            coordinator,
        }
    }
}

/// Matching global prefixes on both interfaces, route on the primary.
pub fn healthy_state() -> NetState {
    NetState::new()
        .with_address(PRIMARY, "fe80::1c2d:3e4f:5a6b:7c8d")
        .with_address(PRIMARY, "2001:db8:1:1::5")
        .with_address(SECONDARY, "2001:db8:1:1::6")
        .with_address(SECONDARY, "192.168.1.20")
        .with_route("fe80::1", PRIMARY)
}
