//! Port probe result model.

use serde::{Deserialize, Serialize};

/// How a probe reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeStrategy {
    /// The OS socket table listed (or did not list) a listener on the port.
    SocketTable,
    /// A direct bind attempt on `0.0.0.0:port`.
    BindAttempt,
    /// Both strategies failed; the port is assumed occupied.
    Inconclusive,
}

/// Occupancy of a single port at the instant it was probed.
///
/// Never cached: occupancy can change between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortProbeResult {
    pub port: u16,
    pub in_use: bool,
    pub strategy: ProbeStrategy,
}

impl PortProbeResult {
    pub fn free(port: u16, strategy: ProbeStrategy) -> Self {
        Self {
            port,
            in_use: false,
            strategy,
        }
    }

    pub fn in_use(port: u16, strategy: ProbeStrategy) -> Self {
        Self {
            port,
            in_use: true,
            strategy,
        }
    }

    /// Fail-safe verdict when neither strategy could decide.
    pub fn inconclusive(port: u16) -> Self {
        Self::in_use(port, ProbeStrategy::Inconclusive)
    }

    pub fn is_inconclusive(&self) -> bool {
        self.strategy == ProbeStrategy::Inconclusive
    }
}
