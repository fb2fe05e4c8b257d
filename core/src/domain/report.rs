//! Point-in-time port report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one configured service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortStatus {
    pub name: String,
    pub description: String,
    pub preferred: u16,
    pub preferred_available: bool,
    /// `None` when the allocator could not produce any port.
    pub recommended_port: Option<u16>,
    pub fallback_ports: Vec<u16>,
    /// Recommended port differs from the preferred one.
    pub conflict: bool,
}

/// A service whose preferred port is not the one it would get now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConflict {
    pub service: String,
    pub preferred: u16,
    pub recommended: Option<u16>,
}

/// Aggregate view of every configured service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortReport {
    pub generated_at: DateTime<Utc>,
    pub services: Vec<ServicePortStatus>,
    pub conflicts: Vec<PortConflict>,
    pub recommendations: Vec<String>,
    pub reserved_ports: Vec<u16>,
}

impl PortReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn service(&self, name: &str) -> Option<&ServicePortStatus> {
        self.services.iter().find(|s| s.name == name)
    }
}
