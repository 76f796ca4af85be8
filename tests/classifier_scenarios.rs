//! Classifier Scenario Tests
//!
//! Runs the health classifier over snapshots built from raw OS addresses,
//! covering the reference scenarios, purity, and prefix history handling.

use std::net::IpAddr;

use ipv6_sentry::acquisition::classify_addresses;
use ipv6_sentry::pipeline::{classify, Observation};
use ipv6_sentry::platform::RawAddress;
use ipv6_sentry::{
    InterfaceId, InterfaceSnapshot, Prefix, PrefixTransition, RouteInfo, VerdictKind,
    VerdictReason,
};

fn snapshot(device: &str, addrs: &[&str]) -> InterfaceSnapshot {
    let raw: Vec<RawAddress> = addrs
        .iter()
        .map(|a| RawAddress::new(a.parse::<IpAddr>().unwrap()))
        .collect();
    classify_addresses(InterfaceId::device_only(device), &raw)
}

fn route_on(device: &str) -> RouteInfo {
    RouteInfo {
        gateway: "fe80::1".parse().unwrap(),
        out_interface: device.to_string(),
    }
}

#[test]
fn scenario_matching_prefixes_reachable_is_ok() {
    let primary = snapshot("en0", &["fe80::1234", "2001:db8:1:1::5", "192.168.1.10"]);
    let secondary = snapshot("en1", &["2001:db8:1:1::6"]);
    let route = route_on("en0");

    let a = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(true),
        history: None,
    });

    assert_eq!(a.verdict.kind, VerdictKind::Ok);
    assert_eq!(a.verdict.reason, VerdictReason::Healthy);
    assert!(!a.repair_recommended);
    assert_eq!(a.verdict.prefix, Prefix::parse("2001:db8:1:1::/64"));
}

#[test]
fn scenario_ula_only_is_error() {
    let primary = snapshot("en0", &["fd00::1"]);
    let secondary = snapshot("en1", &["fd00::2"]);

    let a = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: None,
        connectivity: None,
        history: None,
    });

    assert_eq!(a.verdict.kind, VerdictKind::Error);
    assert_eq!(a.verdict.reason, VerdictReason::UlaOnly);
    assert!(a.repair_recommended);
    assert_eq!(a.canonical_prefix, None);
}

#[test]
fn scenario_unreachable_is_stale_prefix() {
    let primary = snapshot("en0", &["2001:db8:1:1::5"]);
    let secondary = snapshot("en1", &[]);
    let route = route_on("en0");

    let a = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(false),
        history: None,
    });

    assert_eq!(a.verdict.kind, VerdictKind::Error);
    assert_eq!(a.verdict.reason, VerdictReason::StalePrefix);
    assert!(a.repair_recommended);
}

#[test]
fn scenario_prefix_mismatch_off_primary_route_is_warning() {
    let primary = snapshot("en0", &["2001:db8:1:1::5"]);
    let secondary = snapshot("en1", &["2001:db8:2:2::9"]);
    let route = route_on("en1");

    let a = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(true),
        history: None,
    });

    assert_eq!(a.verdict.kind, VerdictKind::Warning);
    assert_eq!(a.verdict.reason, VerdictReason::PrefixMismatch);
    assert!(a.repair_recommended);
    assert!(!a.mismatch_waived);
    assert_eq!(
        a.verdict.to_string(),
        "WARNING: prefix mismatch between interfaces (2001:db8:1:1::/64 vs 2001:db8:2:2::/64)"
    );
}

#[test]
fn scenario_prefix_mismatch_waived_when_primary_owns_route() {
    let primary = snapshot("en0", &["2001:db8:1:1::5"]);
    let secondary = snapshot("en1", &["2001:db8:2:2::9"]);
    let route = route_on("en0");

    let reachable = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(true),
        history: None,
    });
    assert!(reachable.mismatch_waived);
    assert_eq!(reachable.verdict.kind, VerdictKind::Ok);
    assert!(!reachable.repair_recommended);

    // The waiver needs a passing probe; otherwise the mismatch stands.
    let unreachable = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(false),
        history: None,
    });
    assert_eq!(unreachable.verdict.reason, VerdictReason::PrefixMismatch);
}

#[test]
fn missing_route_is_error() {
    let primary = snapshot("en0", &["2001:db8:1:1::5"]);
    let secondary = snapshot("en1", &[]);

    let a = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: None,
        connectivity: Some(true),
        history: None,
    });
    assert_eq!(a.verdict.reason, VerdictReason::DefaultRouteMissing);
    assert!(a.repair_recommended);
}

#[test]
fn classification_is_pure_and_history_transition_is_idempotent() {
    let primary = snapshot("en0", &["2001:db8:1:1::5"]);
    let secondary = snapshot("en1", &["2001:db8:1:1::6"]);
    let route = route_on("en0");
    let obs = Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(true),
        history: None,
    };

    let first = classify(&obs);
    let second = classify(&obs);
    assert_eq!(first, second);
    assert!(matches!(first.transition, PrefixTransition::FirstSeen { .. }));

    // Feeding the result back as history produces no further change.
    let settled = classify(&Observation {
        history: first.canonical_prefix,
        ..obs
    });
    assert_eq!(settled.transition, PrefixTransition::Unchanged);
    assert_eq!(settled.verdict, first.verdict);
}

#[test]
fn secondary_prefix_is_canonical_when_primary_has_none() {
    let primary = snapshot("en0", &[]);
    let secondary = snapshot("en1", &["2001:db8:3:3::1"]);
    let route = route_on("en1");

    let a = classify(&Observation {
        primary: &primary,
        secondary: &secondary,
        route: Some(&route),
        connectivity: Some(true),
        history: Prefix::parse("2001:db8:1:1::/64"),
    });
    assert_eq!(a.canonical_prefix, Prefix::parse("2001:db8:3:3::/64"));
    assert!(matches!(a.transition, PrefixTransition::Changed { .. }));
    assert_eq!(a.verdict.kind, VerdictKind::Ok);
}
