//! Check Coordinator - one end-to-end IPv6 health check
//!
//! ```text
//! 1. allocate generation         (under lock; skip if a repair is running)
//! 2. gather                      (primary, secondary, route in parallel; probe if warranted)
//! 3. log findings                (always, whatever the verdict)
//! 4. classify
//! 5. generation check            (under lock; discard if a newer check started)
//! 6. publish / cooldown / repair (under the same lock)
//! 7. repair -> settle -> post-repair check with auto-fix off
//!                                (own task; outlives a dropped caller)
//! ```
//!
//! Shared mutable state (generation counter, repair state, prefix history)
//! lives behind one mutex that is never held across an await. Publication
//! goes through a `watch` channel written only from step 6.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use super::activity::ActivityLog;
use super::classifier::{classify, should_probe, Assessment, Observation};
use super::repairer::InterfaceRepairer;
use super::state::{CheckOutcome, EngineStatus, RepairState, Trigger};
use crate::acquisition::{ConnectivityProbe, InterfaceStateReader, ProbeReport, RouteStateReader};
use crate::config::SentryConfig;
use crate::platform::SystemOps;
use crate::storage::{keys, PreferenceStore};
use crate::types::{InterfaceId, InterfaceSnapshot, Prefix, PrefixTransition, RouteInfo};

/// Static knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub primary: InterfaceId,
    pub secondary: InterfaceId,
    pub probe_timeout: Duration,
    /// Minimum time between two repair attempts
    pub cooldown: Duration,
    /// Wait after IPv6 is set to automatic, before re-reading state
    pub settle: Duration,
    /// Wait after the repair, before the final re-check
    pub post_repair_settle: Duration,
    pub auto_fix: bool,
}

impl CoordinatorSettings {
    pub fn from_config(config: &SentryConfig) -> Self {
        Self {
            primary: config.interfaces.primary.to_interface_id(),
            secondary: config.interfaces.secondary.to_interface_id(),
            probe_timeout: config.probe.timeout(),
            cooldown: Duration::from_secs(config.repair.cooldown_secs),
            settle: Duration::from_secs(config.repair.settle_secs),
            post_repair_settle: Duration::from_secs(config.repair.post_repair_settle_secs),
            auto_fix: config.repair.auto_fix,
        }
    }
}

/// State guarded by the coordinator mutex.
#[derive(Debug, Default)]
struct Shared {
    generation: u64,
    repair: RepairState,
    history: Option<Prefix>,
}

/// Everything gathered by one check.
struct Gathered {
    primary: InterfaceSnapshot,
    secondary: InterfaceSnapshot,
    route: Option<RouteInfo>,
    probe: Option<ProbeReport>,
}

impl Gathered {
    fn connectivity(&self) -> Option<bool> {
        self.probe.as_ref().map(ProbeReport::reachable)
    }
}

/// Result of the evaluate phase.
enum Step {
    Done(CheckOutcome),
    Repair { generation: u64 },
}

/// Clears `in_progress` even if the repair task panics.
struct RepairGuard {
    coordinator: Arc<CheckCoordinator>,
}

impl Drop for RepairGuard {
    fn drop(&mut self) {
        let mut shared = self.coordinator.lock_shared();
        shared.repair.mark_finished();
        self.coordinator
            .status_tx
            .send_modify(|status| status.repair_in_progress = false);
    }
}

/// Serializes, deduplicates and drives health checks and repairs.
pub struct CheckCoordinator {
    settings: CoordinatorSettings,
    interfaces: InterfaceStateReader,
    routes: RouteStateReader,
    probe: Arc<dyn ConnectivityProbe>,
    repairer: InterfaceRepairer,
    prefs: Arc<dyn PreferenceStore>,
    log: Arc<ActivityLog>,
    auto_fix: AtomicBool,
    shared: Mutex<Shared>,
    status_tx: watch::Sender<EngineStatus>,
}

impl CheckCoordinator {
    pub fn new(
        settings: CoordinatorSettings,
        system: Arc<dyn SystemOps>,
        probe: Arc<dyn ConnectivityProbe>,
        prefs: Arc<dyn PreferenceStore>,
        log: Arc<ActivityLog>,
    ) -> Self {
        let history = read_pref(&*prefs, keys::LAST_OBSERVED_PREFIX)
            .and_then(|s| Prefix::parse(&s));
        let last_repair = prefs.get_time(keys::LAST_REPAIR_TIME).ok().flatten();
        let last_check = prefs.get_time(keys::LAST_CHECK_TIME).ok().flatten();
        let auto_fix = prefs
            .get_bool(keys::AUTO_FIX_ENABLED)
            .ok()
            .flatten()
            .unwrap_or(settings.auto_fix);

        if let Some(prefix) = history {
            tracing::info!(prefix = %prefix, "Restored last observed prefix");
        }

        let (status_tx, _) = watch::channel(EngineStatus {
            last_check_at: last_check,
            last_repair_at: last_repair,
            ..EngineStatus::default()
        });

        let repairer = InterfaceRepairer::new(
            Arc::clone(&system),
            settings.primary.clone(),
            settings.settle,
            Arc::clone(&log),
        );

        Self {
            interfaces: InterfaceStateReader::new(Arc::clone(&system)),
            routes: RouteStateReader::new(system),
            probe,
            repairer,
            prefs,
            log,
            auto_fix: AtomicBool::new(auto_fix),
            shared: Mutex::new(Shared {
                generation: 0,
                repair: RepairState::restored(last_repair, settings.cooldown),
                history,
            }),
            status_tx,
            settings,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn activity_log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    /// Latest published status.
    pub fn status(&self) -> EngineStatus {
        self.status_tx.borrow().clone()
    }

    /// Receiver that observes every publication.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status_tx.subscribe()
    }

    pub fn auto_fix_enabled(&self) -> bool {
        self.auto_fix.load(Ordering::SeqCst)
    }

    pub fn set_auto_fix(&self, enabled: bool) {
        self.auto_fix.store(enabled, Ordering::SeqCst);
        if let Err(e) = self.prefs.set_bool(keys::AUTO_FIX_ENABLED, enabled) {
            tracing::warn!(error = %e, "Failed to persist auto-fix setting");
        }
        self.log.info(format!(
            "Automatic repair {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    /// Change the auto-fix setting for this process only.
    pub fn override_auto_fix(&self, enabled: bool) {
        self.auto_fix.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "Auto-fix overridden for this session");
    }

    pub fn is_repair_in_progress(&self) -> bool {
        self.lock_shared().repair.in_progress
    }

    /// Current value of the generation counter.
    pub fn current_generation(&self) -> u64 {
        self.lock_shared().generation
    }

    /// Last confirmed canonical prefix.
    pub fn observed_prefix(&self) -> Option<Prefix> {
        self.lock_shared().history
    }

    /// Run one check. `allow_auto_fix` is combined with the auto-fix setting.
    ///
    /// Never fails: every problem ends up as a verdict or an activity entry.
    /// A started repair runs on its own task, so dropping the returned
    /// future (a disconnected HTTP client, shutdown) never cuts it short.
    pub async fn check(self: &Arc<Self>, trigger: Trigger, allow_auto_fix: bool) -> CheckOutcome {
        let allow = allow_auto_fix && self.auto_fix_enabled();
        let generation = match self.evaluate(trigger, allow).await {
            Step::Done(outcome) => return outcome,
            Step::Repair { generation } => generation,
        };

        let guard = RepairGuard {
            coordinator: Arc::clone(self),
        };
        let task = tokio::spawn(async move {
            let outcome = guard.coordinator.repair_and_recheck(generation).await;
            drop(guard);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(generation, error = %e, "Repair task failed");
                self.log
                    .error(format!("Check #{generation}: repair aborted ({e})"));
                CheckOutcome::RepairAborted { generation }
            }
        }
    }

    async fn repair_and_recheck(&self, generation: u64) -> CheckOutcome {
        let repair = self.repairer.repair().await;
        self.status_tx.send_modify(|status| {
            status.last_repair_outcome = Some(repair.clone());
        });

        tokio::time::sleep(self.settings.post_repair_settle).await;

        // Auto-fix is off here, so evaluate never asks for another repair.
        let verdict = match self.evaluate(Trigger::PostRepair, false).await {
            Step::Done(follow_up) => follow_up.published_verdict().cloned(),
            Step::Repair { .. } => None,
        };

        CheckOutcome::Repaired {
            generation,
            repair,
            verdict,
        }
    }

    async fn evaluate(&self, trigger: Trigger, allow_auto_fix: bool) -> Step {
        // Phase 1: generation
        let (generation, history) = {
            let mut shared = self.lock_shared();
            if trigger.is_external() && shared.repair.in_progress {
                drop(shared);
                self.log
                    .info(format!("Check ({trigger}) skipped: repair in progress"));
                return Step::Done(CheckOutcome::SkippedRepairInProgress);
            }
            shared.generation += 1;
            (shared.generation, shared.history)
        };
        tracing::debug!(generation, trigger = %trigger, "check started");

        // Phase 2: gather
        let gathered = self.gather().await;

        // Phase 3: findings
        self.log_findings(generation, trigger, &gathered);

        // Phase 4: classify
        let assessment = classify(&Observation {
            primary: &gathered.primary,
            secondary: &gathered.secondary,
            route: gathered.route.as_ref(),
            connectivity: gathered.connectivity(),
            history,
        });
        if assessment.mismatch_waived {
            self.log.info(format!(
                "Prefix mismatch ignored: {} owns the default route and is reachable",
                self.settings.primary
            ));
        }

        // Phase 5-6: apply under the lock
        self.apply(generation, trigger, allow_auto_fix, gathered, assessment)
    }

    async fn gather(&self) -> Gathered {
        let (primary, secondary, route) = tokio::join!(
            self.interfaces.read(&self.settings.primary),
            self.interfaces.read(&self.settings.secondary),
            self.routes.current_default_route(),
        );
        let probe = if should_probe(&primary, &secondary) {
            Some(self.probe.probe(self.settings.probe_timeout).await)
        } else {
            None
        };
        Gathered {
            primary,
            secondary,
            route,
            probe,
        }
    }

    fn apply(
        &self,
        generation: u64,
        trigger: Trigger,
        allow_auto_fix: bool,
        gathered: Gathered,
        assessment: Assessment,
    ) -> Step {
        let mut shared = self.lock_shared();

        if shared.generation != generation {
            let current = shared.generation;
            drop(shared);
            self.log.info(format!(
                "Check #{generation} ({trigger}) superseded by #{current}, result discarded"
            ));
            return Step::Done(CheckOutcome::Superseded {
                generation,
                current,
            });
        }

        if assessment.transition.is_change() {
            shared.history = assessment.canonical_prefix;
            self.record_transition(&assessment.transition);
        }

        let verdict = assessment.verdict.clone();
        let now = Utc::now();
        if let Err(e) = self.prefs.set_time(keys::LAST_CHECK_TIME, now) {
            tracing::warn!(error = %e, "Failed to persist last check time");
        }

        let wants_repair = assessment.repair_recommended && allow_auto_fix;
        let cooldown_remaining = if wants_repair {
            shared.repair.cooldown_remaining()
        } else {
            None
        };

        if wants_repair && cooldown_remaining.is_none() {
            shared.repair.mark_started(self.settings.cooldown);
            let started = shared.repair.last_attempt_wall;
            if let Some(at) = started {
                if let Err(e) = self.prefs.set_time(keys::LAST_REPAIR_TIME, at) {
                    tracing::warn!(error = %e, "Failed to persist last repair time");
                }
            }
            self.status_tx.send_modify(|status| {
                status.repair_in_progress = true;
                status.last_repair_at = started;
                status.last_check_at = Some(now);
            });
            drop(shared);
            self.log.warn(format!(
                "Check #{generation}: {verdict}; starting repair of {}",
                self.settings.primary
            ));
            return Step::Repair { generation };
        }

        let in_progress = shared.repair.in_progress;
        self.status_tx.send_modify(|status| {
            status.verdict = verdict.clone();
            status.generation = generation;
            status.primary = Some(gathered.primary);
            status.secondary = Some(gathered.secondary);
            status.route = gathered.route;
            status.connectivity = gathered.probe.as_ref().map(ProbeReport::reachable);
            status.last_check_at = Some(now);
            status.repair_in_progress = in_progress;
        });
        drop(shared);

        self.log.record(verdict_level(&verdict), format!("Check #{generation}: {verdict}"));

        if let Some(remaining) = cooldown_remaining {
            self.log.warn(format!(
                "Repair skipped: cooldown active for another {}s",
                remaining.as_secs()
            ));
            return Step::Done(CheckOutcome::CooldownSkipped {
                generation,
                verdict,
                remaining_secs: remaining.as_secs(),
            });
        }

        if assessment.repair_recommended && !allow_auto_fix && trigger != Trigger::PostRepair {
            self.log.info("Repair recommended but automatic repair is disabled");
        }

        Step::Done(CheckOutcome::Published {
            generation,
            verdict,
        })
    }

    fn record_transition(&self, transition: &PrefixTransition) {
        let result = match transition {
            PrefixTransition::FirstSeen { prefix } | PrefixTransition::Changed { to: prefix, .. } => {
                self.log.info(transition.to_string());
                self.prefs.set(keys::LAST_OBSERVED_PREFIX, &prefix.to_string())
            }
            PrefixTransition::Lost { .. } => {
                self.log.warn(transition.to_string());
                self.prefs.remove(keys::LAST_OBSERVED_PREFIX)
            }
            PrefixTransition::Unchanged => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist observed prefix");
        }
    }

    fn log_findings(&self, generation: u64, trigger: Trigger, gathered: &Gathered) {
        self.log.info(format!("Check #{generation} ({trigger}) started"));
        for snapshot in [&gathered.primary, &gathered.secondary] {
            self.log.info(describe_snapshot(snapshot));
        }
        match &gathered.route {
            Some(route) => self.log.info(format!(
                "Default route: via {} on {}",
                route.gateway, route.out_interface
            )),
            None => self.log.warn("Default route: none"),
        }
        match &gathered.probe {
            None => self.log.info("Connectivity: not tested (no global address)"),
            Some(report) => {
                for result in &report.targets {
                    let mut line = format!("Connectivity: {} {}", result.target, result.outcome);
                    if let Some(echo) = result.echo_reachable {
                        line.push_str(if echo { "; echo ok" } else { "; echo failed" });
                    }
                    if result.outcome.is_success() {
                        self.log.info(line);
                    } else {
                        self.log.warn(line);
                    }
                }
            }
        }
    }

    fn lock_shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| {
            tracing::warn!("Coordinator mutex poisoned, recovering");
            e.into_inner()
        })
    }
}

fn read_pref(prefs: &dyn PreferenceStore, key: &str) -> Option<String> {
    match prefs.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read preference");
            None
        }
    }
}

fn describe_snapshot(snapshot: &InterfaceSnapshot) -> String {
    fn or_none<T: std::fmt::Display>(value: Option<T>) -> String {
        value.map_or_else(|| "none".to_string(), |v| v.to_string())
    }
    let prefix = snapshot
        .prefix()
        .map(|p| format!(", prefix {p}"))
        .unwrap_or_default();
    format!(
        "{}: global {}, ULA {}, IPv4 {}{}",
        snapshot.interface,
        or_none(snapshot.global_ipv6),
        or_none(snapshot.unique_local_ipv6),
        or_none(snapshot.ipv4),
        prefix
    )
}

fn verdict_level(verdict: &crate::types::HealthVerdict) -> super::activity::LogLevel {
    use super::activity::LogLevel;
    use crate::types::VerdictKind;
    match verdict.kind {
        VerdictKind::Ok | VerdictKind::Inactive => LogLevel::Info,
        VerdictKind::Warning => LogLevel::Warn,
        VerdictKind::Error => LogLevel::Error,
    }
}
