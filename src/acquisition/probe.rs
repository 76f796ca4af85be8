//! Connectivity probe: HTTPS requests to IPv6-literal endpoints with an
//! ICMPv6 echo for diagnostics when a target fails.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::platform::SystemOps;

/// How one target responded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TargetOutcome {
    Success { status: u16 },
    HttpStatus { status: u16 },
    Timeout,
    RequestError { message: String },
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Success { .. })
    }
}

impl std::fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetOutcome::Success { status } => write!(f, "reachable (HTTP {status})"),
            TargetOutcome::HttpStatus { status } => write!(f, "HTTP {status}"),
            TargetOutcome::Timeout => write!(f, "timed out"),
            TargetOutcome::RequestError { message } => write!(f, "request failed: {message}"),
        }
    }
}

/// Result for a single probed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetResult {
    pub target: String,
    pub outcome: TargetOutcome,
    /// Diagnostic echo issued after a failure; never affects reachability.
    pub echo_reachable: Option<bool>,
}

/// Outcome of one probe run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub targets: Vec<TargetResult>,
}

impl ProbeReport {
    /// True only if at least one target was tried and all succeeded.
    pub fn reachable(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(|t| t.outcome.is_success())
    }
}

/// External IPv6 reachability test.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Probe the targets in order, stopping at the first failure.
    async fn probe(&self, timeout: Duration) -> ProbeReport;
}

/// Map an HTTP status to an outcome. 2xx and 3xx count as success; redirects
/// are not followed because they usually point at IPv4-capable hostnames.
pub fn classify_status(status: u16) -> TargetOutcome {
    if (200..400).contains(&status) {
        TargetOutcome::Success { status }
    } else {
        TargetOutcome::HttpStatus { status }
    }
}

/// HTTPS probe against fixed IPv6-literal URLs.
pub struct HttpsProbe {
    client: reqwest::Client,
    targets: Vec<String>,
    system: Arc<dyn SystemOps>,
    echo_host: String,
    echo_count: u32,
}

impl HttpsProbe {
    pub fn new(
        targets: Vec<String>,
        system: Arc<dyn SystemOps>,
        echo_host: impl Into<String>,
        echo_count: u32,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            // A proxy would answer on our behalf; reachability is tested direct.
            .no_proxy()
            .user_agent(concat!("ipv6-sentry/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            targets,
            system,
            echo_host: echo_host.into(),
            echo_count,
        })
    }

    async fn request(&self, target: &str, timeout: Duration) -> TargetOutcome {
        let send = self.client.get(target).timeout(timeout).send();
        // The outer timeout drops the in-flight request if the client's own
        // timeout does not fire (e.g. stuck in connect).
        match tokio::time::timeout(timeout + Duration::from_millis(250), send).await {
            Err(_) => TargetOutcome::Timeout,
            Ok(Err(e)) if e.is_timeout() => TargetOutcome::Timeout,
            Ok(Err(e)) => TargetOutcome::RequestError {
                message: e.to_string(),
            },
            Ok(Ok(resp)) => classify_status(resp.status().as_u16()),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpsProbe {
    async fn probe(&self, timeout: Duration) -> ProbeReport {
        let mut report = ProbeReport::default();
        for target in &self.targets {
            let outcome = self.request(target, timeout).await;
            let failed = !outcome.is_success();
            let echo_reachable = if failed {
                Some(self.system.echo(&self.echo_host, self.echo_count, timeout).await)
            } else {
                None
            };
            tracing::debug!(url = %target, outcome = %outcome, echo = ?echo_reachable, "probe target");
            report.targets.push(TargetResult {
                target: target.clone(),
                outcome,
                echo_reachable,
            });
            if failed {
                break;
            }
        }
        report
    }
}
