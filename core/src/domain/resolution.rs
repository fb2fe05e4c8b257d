//! Allocation, reclaim and resolution outcome models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which candidate satisfied an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationSource {
    Preferred,
    Fallback,
    Dynamic,
}

/// Result of walking a service's candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub port: u16,
    pub source: AllocationSource,
    /// Candidates that probed as occupied during the walk, in probe order.
    pub conflicts: Vec<u16>,
}

/// How the resolver arrived at a service's port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionMethod {
    /// The preferred port was free.
    Preferred,
    /// A configured fallback port was free.
    Fallback,
    /// The preferred port was freed by terminating its occupants.
    ForcedReclaim,
    /// Every candidate was taken; the OS assigned an ephemeral port.
    Dynamic,
}

impl From<AllocationSource> for ResolutionMethod {
    fn from(source: AllocationSource) -> Self {
        match source {
            AllocationSource::Preferred => ResolutionMethod::Preferred,
            AllocationSource::Fallback => ResolutionMethod::Fallback,
            AllocationSource::Dynamic => ResolutionMethod::Dynamic,
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionMethod::Preferred => "preferred",
            ResolutionMethod::Fallback => "fallback",
            ResolutionMethod::ForcedReclaim => "forced-reclaim",
            ResolutionMethod::Dynamic => "dynamic",
        };
        f.write_str(s)
    }
}

/// The port a service should bind to, and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutcome {
    pub service_name: String,
    pub resolved_port: u16,
    pub method: ResolutionMethod,
    /// Occupied ports met on the way, in the order they were probed.
    pub conflicts_encountered: Vec<u16>,
}

/// Per-service entry of a batch resolution.
///
/// Failed services are kept in the map so operators can see what needs
/// manual intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ServiceResolution {
    Resolved(ResolutionOutcome),
    Failed { error: String },
}

impl ServiceResolution {
    /// The resolved port, if resolution succeeded.
    pub fn port(&self) -> Option<u16> {
        match self {
            ServiceResolution::Resolved(outcome) => Some(outcome.resolved_port),
            ServiceResolution::Failed { .. } => None,
        }
    }

    pub fn outcome(&self) -> Option<&ResolutionOutcome> {
        match self {
            ServiceResolution::Resolved(outcome) => Some(outcome),
            ServiceResolution::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ServiceResolution::Failed { .. })
    }
}

/// A PID that could not be terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimFailure {
    pub pid: u32,
    pub reason: String,
}

/// What happened while reclaiming a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimReport {
    pub port: u16,
    /// PIDs found holding the port.
    pub pids: Vec<u32>,
    /// PIDs that accepted the termination signal.
    pub signalled: Vec<u32>,
    pub failures: Vec<ReclaimFailure>,
    /// Whether the port re-probed as free afterwards.
    pub freed: bool,
}

impl ReclaimReport {
    pub(crate) fn not_freed(port: u16) -> Self {
        Self {
            port,
            pids: Vec::new(),
            signalled: Vec::new(),
            failures: Vec::new(),
            freed: false,
        }
    }
}
