//! Health verdicts and prefix history transitions

use serde::{Deserialize, Serialize};

use super::Prefix;

/// Severity of a health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    /// No check has completed yet
    #[default]
    Inactive,
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictKind::Inactive => write!(f, "INACTIVE"),
            VerdictKind::Ok => write!(f, "OK"),
            VerdictKind::Warning => write!(f, "WARNING"),
            VerdictKind::Error => write!(f, "ERROR"),
        }
    }
}

/// Machine-readable reason behind a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    NotChecked,
    /// Only unique-local addresses remain, the global prefix is gone
    UlaOnly,
    /// No IPv6 beyond link-local on either interface
    NoGlobalIpv6,
    /// Global address present but no default route
    DefaultRouteMissing,
    /// Primary and secondary disagree on the global prefix
    PrefixMismatch,
    /// Global prefix present but the internet is unreachable over it
    StalePrefix,
    Healthy,
}

impl VerdictReason {
    /// Human-readable description rendered by status consumers.
    pub fn description(&self) -> &'static str {
        match self {
            VerdictReason::NotChecked => "no check has completed yet",
            VerdictReason::UlaOnly => "prefix likely lost, ULA-only reachability",
            VerdictReason::NoGlobalIpv6 => "no global IPv6 configured at all",
            VerdictReason::DefaultRouteMissing => "default route missing, RA silence suspected",
            VerdictReason::PrefixMismatch => "prefix mismatch between interfaces",
            VerdictReason::StalePrefix => "prefix present but unreachable, likely stale",
            VerdictReason::Healthy => "IPv6 connectivity healthy",
        }
    }
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Authoritative health status of the host's IPv6 connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub kind: VerdictKind,
    pub reason: VerdictReason,
    /// Prefix the verdict is about (canonical prefix, or the primary's in a mismatch)
    pub prefix: Option<Prefix>,
    /// Secondary prefix, set only for mismatches
    pub other_prefix: Option<Prefix>,
}

impl HealthVerdict {
    pub fn new(kind: VerdictKind, reason: VerdictReason) -> Self {
        Self {
            kind,
            reason,
            prefix: None,
            other_prefix: None,
        }
    }

    pub fn inactive() -> Self {
        Self::new(VerdictKind::Inactive, VerdictReason::NotChecked)
    }

    pub fn with_prefix(mut self, prefix: Option<Prefix>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_other_prefix(mut self, prefix: Option<Prefix>) -> Self {
        self.other_prefix = prefix;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.kind == VerdictKind::Ok
    }
}

impl Default for HealthVerdict {
    fn default() -> Self {
        Self::inactive()
    }
}

impl std::fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)?;
        match (self.prefix, self.other_prefix) {
            (Some(a), Some(b)) => write!(f, " ({a} vs {b})"),
            (Some(a), None) => write!(f, " ({a})"),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Prefix history
// ============================================================================

/// How the canonical prefix moved relative to the last confirmed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrefixTransition {
    /// No history existed, a prefix is now present
    FirstSeen { prefix: Prefix },
    Changed { from: Prefix, to: Prefix },
    /// History existed, no global address remains on either interface
    Lost { last: Prefix },
    Unchanged,
}

impl PrefixTransition {
    /// Compare the current canonical prefix against history.
    pub fn between(history: Option<Prefix>, current: Option<Prefix>) -> Self {
        match (history, current) {
            (None, Some(prefix)) => PrefixTransition::FirstSeen { prefix },
            (Some(from), Some(to)) if from != to => PrefixTransition::Changed { from, to },
            (Some(last), None) => PrefixTransition::Lost { last },
            _ => PrefixTransition::Unchanged,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, PrefixTransition::Unchanged)
    }
}

impl std::fmt::Display for PrefixTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixTransition::FirstSeen { prefix } => write!(f, "prefix first observed: {prefix}"),
            PrefixTransition::Changed { from, to } => write!(f, "prefix changed: {from} -> {to}"),
            PrefixTransition::Lost { last } => write!(f, "prefix lost (was {last})"),
            PrefixTransition::Unchanged => write!(f, "prefix unchanged"),
        }
    }
}
