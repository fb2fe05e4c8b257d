//! Port scanner port (interface).

use std::collections::HashSet;

use crate::error::Result;

/// Port for inspecting the host's TCP socket table.
///
/// Implementations handle platform-specific details (ss, netstat, lsof).
/// Any error means "tooling unavailable"; callers fall back to binding.
pub trait PortScannerPort: Send + Sync {
    /// All local TCP ports with a socket in LISTEN state.
    fn listening_ports(&self) -> impl std::future::Future<Output = Result<HashSet<u16>>> + Send;

    /// PIDs of the processes holding `port`.
    ///
    /// An empty list means no owner could be found.
    fn pids_on_port(&self, port: u16)
        -> impl std::future::Future<Output = Result<Vec<u32>>> + Send;
}
