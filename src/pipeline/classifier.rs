//! Health classifier: pure decision over one check's observations.
//!
//! Rules, first match wins:
//!
//! ```text
//! 1. no global address anywhere
//!      ULA present      -> Error   (UlaOnly)            repair
//!      nothing          -> Warning (NoGlobalIpv6)       no repair
//! 2. global present, no default route
//!                       -> Error   (DefaultRouteMissing) repair
//! 3. primary/secondary prefixes differ
//!      primary owns route and probe passed -> waived, continue at 4
//!      otherwise        -> Warning (PrefixMismatch)     repair
//! 4. probe failed       -> Error   (StalePrefix)        repair
//! 5.                    -> Ok
//! ```
//!
//! The canonical-prefix transition against history is computed on every
//! call, whatever the verdict.

use serde::Serialize;

use crate::types::{
    HealthVerdict, InterfaceSnapshot, Prefix, PrefixTransition, RouteInfo, VerdictKind,
    VerdictReason,
};

/// Everything one check observed.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub primary: &'a InterfaceSnapshot,
    pub secondary: &'a InterfaceSnapshot,
    pub route: Option<&'a RouteInfo>,
    /// `None` when the probe was not run
    pub connectivity: Option<bool>,
    pub history: Option<Prefix>,
}

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub verdict: HealthVerdict,
    pub repair_recommended: bool,
    /// Primary's prefix if present, else secondary's
    pub canonical_prefix: Option<Prefix>,
    pub transition: PrefixTransition,
    /// Prefixes differed but the primary was authoritative and reachable
    pub mismatch_waived: bool,
}

/// The probe is only worth running when some interface has a global address.
pub fn should_probe(primary: &InterfaceSnapshot, secondary: &InterfaceSnapshot) -> bool {
    primary.has_global() || secondary.has_global()
}

/// Primary's prefix if present, else secondary's.
pub fn canonical_prefix(primary: &InterfaceSnapshot, secondary: &InterfaceSnapshot) -> Option<Prefix> {
    primary.prefix().or_else(|| secondary.prefix())
}

pub fn classify(obs: &Observation<'_>) -> Assessment {
    let canonical = canonical_prefix(obs.primary, obs.secondary);
    let transition = PrefixTransition::between(obs.history, canonical);

    let (verdict, repair_recommended, mismatch_waived) = decide(obs, canonical);

    Assessment {
        verdict,
        repair_recommended,
        canonical_prefix: canonical,
        transition,
        mismatch_waived,
    }
}

fn decide(obs: &Observation<'_>, canonical: Option<Prefix>) -> (HealthVerdict, bool, bool) {
    // Rule 1
    if !should_probe(obs.primary, obs.secondary) {
        return if obs.primary.has_unique_local() || obs.secondary.has_unique_local() {
            (HealthVerdict::new(VerdictKind::Error, VerdictReason::UlaOnly), true, false)
        } else {
            (HealthVerdict::new(VerdictKind::Warning, VerdictReason::NoGlobalIpv6), false, false)
        };
    }

    // Rule 2
    let Some(route) = obs.route else {
        return (
            HealthVerdict::new(VerdictKind::Error, VerdictReason::DefaultRouteMissing)
                .with_prefix(canonical),
            true,
            false,
        );
    };

    let reachable = obs.connectivity.unwrap_or(false);

    // Rule 3
    let mut mismatch_waived = false;
    if let (Some(primary), Some(secondary)) = (obs.primary.prefix(), obs.secondary.prefix()) {
        if primary != secondary {
            if route.is_owned_by(&obs.primary.interface) && reachable {
                mismatch_waived = true;
            } else {
                return (
                    HealthVerdict::new(VerdictKind::Warning, VerdictReason::PrefixMismatch)
                        .with_prefix(Some(primary))
                        .with_other_prefix(Some(secondary)),
                    true,
                    false,
                );
            }
        }
    }

    // Rule 4
    if !reachable {
        return (
            HealthVerdict::new(VerdictKind::Error, VerdictReason::StalePrefix).with_prefix(canonical),
            true,
            mismatch_waived,
        );
    }

    // Rule 5
    (
        HealthVerdict::new(VerdictKind::Ok, VerdictReason::Healthy).with_prefix(canonical),
        false,
        mismatch_waived,
    )
}
