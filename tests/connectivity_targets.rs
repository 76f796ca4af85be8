//! Connectivity Target Tests
//!
//! Runs `HttpsProbe` against local Axum listeners to pin down the target
//! contract: order, short-circuit on the first failure, a diagnostic echo
//! only after a failure, and redirects counted as success without being
//! followed.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;

use common::{healthy_state, FakeSystem};
use ipv6_sentry::acquisition::{ConnectivityProbe, HttpsProbe, TargetOutcome};

const ECHO_HOST: &str = "ipv6.echo.test";

#[derive(Default)]
struct Hits {
    ok: AtomicUsize,
    unavailable: AtomicUsize,
}

async fn ok(State(hits): State<Arc<Hits>>) -> StatusCode {
    hits.ok.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn unavailable(State(hits): State<Arc<Hits>>) -> StatusCode {
    hits.unavailable.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

async fn moved() -> Redirect {
    Redirect::permanent("/unavailable")
}

/// Serve `/ok`, `/unavailable` and `/moved` on an ephemeral loopback port.
async fn spawn_targets() -> (SocketAddr, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/ok", get(ok))
        .route("/unavailable", get(unavailable))
        .route("/moved", get(moved))
        .with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn test_first_failure_stops_remaining_targets() {
    let (addr, hits) = spawn_targets().await;
    let system = FakeSystem::new(healthy_state());
    let checker = HttpsProbe::new(
        vec![url(addr, "/unavailable"), url(addr, "/ok")],
        system.clone(),
        ECHO_HOST,
        2,
    )
    .unwrap();

    let report = checker.probe(Duration::from_secs(2)).await;

    assert_eq!(report.targets.len(), 1, "second target must not be tried");
    assert_eq!(report.targets[0].target, url(addr, "/unavailable"));
    assert_eq!(report.targets[0].outcome, TargetOutcome::HttpStatus { status: 503 });
    assert_eq!(report.targets[0].echo_reachable, Some(false));
    assert!(!report.reachable());

    assert_eq!(hits.unavailable.load(Ordering::SeqCst), 1);
    assert_eq!(hits.ok.load(Ordering::SeqCst), 0);
    assert_eq!(system.calls(), vec![format!("echo:{ECHO_HOST}")]);
}

#[tokio::test]
async fn test_all_targets_succeeding_is_reachable_without_echo() {
    let (addr, hits) = spawn_targets().await;
    let system = FakeSystem::new(healthy_state());
    let targets = vec![url(addr, "/ok"), url(addr, "/moved")];
    let checker = HttpsProbe::new(targets.clone(), system.clone(), ECHO_HOST, 2).unwrap();

    let report = checker.probe(Duration::from_secs(2)).await;

    assert!(report.reachable());
    let tried: Vec<&str> = report.targets.iter().map(|t| t.target.as_str()).collect();
    assert_eq!(tried, targets.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(report.targets[0].outcome, TargetOutcome::Success { status: 200 });
    assert_eq!(report.targets[1].outcome, TargetOutcome::Success { status: 308 });
    assert!(report.targets.iter().all(|t| t.echo_reachable.is_none()));

    assert_eq!(hits.ok.load(Ordering::SeqCst), 1);
    // The redirect is not followed.
    assert_eq!(hits.unavailable.load(Ordering::SeqCst), 0);
    assert_eq!(system.count_calls("echo:"), 0);
}

#[tokio::test]
async fn test_refused_connection_is_a_failure_with_echo() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let system = FakeSystem::new(healthy_state());
    let checker = HttpsProbe::new(vec![url(addr, "/ok")], system.clone(), ECHO_HOST, 1).unwrap();

    let report = checker.probe(Duration::from_secs(2)).await;

    assert_eq!(report.targets.len(), 1);
    assert!(matches!(report.targets[0].outcome, TargetOutcome::RequestError { .. }));
    assert!(!report.reachable());
    assert_eq!(system.count_calls("echo:"), 1);
}
