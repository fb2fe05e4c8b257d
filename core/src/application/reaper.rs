//! Reclaim of an occupied port.
//!
//! Finds the processes holding a port, kills each of them, waits for
//! the OS to release the socket, then re-probes. Every failure is absorbed
//! into the returned [`ReclaimReport`]; reclaiming never errors.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::adapters::{PortScanner, ProcessKiller, SocketBinder};
use crate::domain::{ReclaimFailure, ReclaimReport};
use crate::ports::{PortScannerPort, ProcessKillerPort, SocketBinderPort};

use super::PortProbe;

/// Terminates the processes occupying a port.
#[derive(Debug, Clone)]
pub struct ProcessReaper<S = PortScanner, K = ProcessKiller, B = SocketBinder> {
    scanner: S,
    killer: K,
    probe: PortProbe<S, B>,
    settle_delay: Duration,
    timeout: Duration,
}

impl ProcessReaper {
    /// Reaper backed by the host's real tooling and signals.
    pub fn system(settle_delay: Duration, timeout: Duration) -> Self {
        Self::new(
            PortScanner::new(),
            ProcessKiller::new(),
            PortProbe::system(timeout),
            settle_delay,
            timeout,
        )
    }
}

impl<S, K, B> ProcessReaper<S, K, B>
where
    S: PortScannerPort,
    K: ProcessKillerPort,
    B: SocketBinderPort,
{
    pub fn new(
        scanner: S,
        killer: K,
        probe: PortProbe<S, B>,
        settle_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            scanner,
            killer,
            probe,
            settle_delay,
            timeout,
        }
    }

    /// Whether `port` is confirmed free after the reclaim attempt.
    pub async fn free_port(&self, port: u16) -> bool {
        self.reclaim(port).await.freed
    }

    /// Force-kill the holders of `port`, reporting every PID found and
    /// what happened to it.
    pub async fn reclaim(&self, port: u16) -> ReclaimReport {
        self.reclaim_with(port, true).await
    }

    /// Like [`reclaim`](Self::reclaim), but asks each holder to exit with
    /// SIGTERM before resorting to SIGKILL.
    pub async fn reclaim_gracefully(&self, port: u16) -> ReclaimReport {
        self.reclaim_with(port, false).await
    }

    async fn reclaim_with(&self, port: u16, force: bool) -> ReclaimReport {
        let pids = match timeout(self.timeout, self.scanner.pids_on_port(port)).await {
            Ok(Ok(pids)) => pids,
            Ok(Err(e)) => {
                warn!(port = port, error = %e, "Could not enumerate processes on port");
                return ReclaimReport::not_freed(port);
            }
            Err(_) => {
                warn!(port = port, "Timed out enumerating processes on port");
                return ReclaimReport::not_freed(port);
            }
        };

        if pids.is_empty() {
            let freed = !self.probe.is_port_in_use(port).await;
            debug!(port = port, freed = freed, "No process found holding port");
            return ReclaimReport {
                port,
                pids,
                signalled: Vec::new(),
                failures: Vec::new(),
                freed,
            };
        }

        info!(port = port, pids = ?pids, force = force, "Terminating processes holding port");

        let mut signalled = Vec::new();
        let mut failures = Vec::new();
        // One stubborn process must not stop the others from being signalled
        for &pid in &pids {
            let reason = match timeout(self.timeout, self.killer.kill(pid, force)).await {
                Ok(Ok(true)) => {
                    signalled.push(pid);
                    continue;
                }
                Ok(Ok(false)) => "signal was not delivered".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(_) => "timed out sending signal".to_string(),
            };
            warn!(pid = pid, port = port, reason = %reason, "Failed to terminate process");
            failures.push(ReclaimFailure { pid, reason });
        }

        if !signalled.is_empty() && !self.settle_delay.is_zero() {
            debug!(
                port = port,
                settle_ms = self.settle_delay.as_millis() as u64,
                "Waiting for socket release"
            );
            tokio::time::sleep(self.settle_delay).await;
        }

        let freed = !self.probe.is_port_in_use(port).await;
        if freed {
            info!(port = port, "Port reclaimed");
        } else {
            warn!(port = port, "Port still occupied after reclaim attempt");
        }

        ReclaimReport {
            port,
            pids,
            signalled,
            failures,
            freed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryHost;

    fn reaper(host: &InMemoryHost) -> ProcessReaper<InMemoryHost, InMemoryHost, InMemoryHost> {
        let timeout = Duration::from_millis(200);
        ProcessReaper::new(
            host.clone(),
            host.clone(),
            PortProbe::new(host.clone(), host.clone(), timeout),
            Duration::ZERO,
            timeout,
        )
    }

    #[tokio::test]
    async fn test_free_port_already_free_signals_nothing() {
        let host = InMemoryHost::new();

        assert!(reaper(&host).free_port(3002).await);
        assert!(host.signalled().is_empty());
    }

    #[tokio::test]
    async fn test_reclaim_kills_all_holders() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100).occupy(3002, 101);

        let report = reaper(&host).reclaim(3002).await;
        assert!(report.freed);
        assert_eq!(report.pids, vec![100, 101]);
        assert_eq!(report.signalled, vec![100, 101]);
        assert!(report.failures.is_empty());
        assert!(!host.is_occupied(3002));
        assert_eq!(host.signals(), vec![(100, true), (101, true)]);
    }

    #[tokio::test]
    async fn test_graceful_reclaim_requests_exit() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100);

        let report = reaper(&host).reclaim_gracefully(3002).await;
        assert!(report.freed);
        assert_eq!(host.signals(), vec![(100, false)]);
        assert!(!host.is_running(100));
    }

    #[tokio::test]
    async fn test_stubborn_process_does_not_block_siblings() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100).occupy(3002, 101).make_stubborn(100);

        let report = reaper(&host).reclaim(3002).await;
        assert!(!report.freed);
        assert_eq!(host.signalled(), vec![100, 101]);
        assert_eq!(report.signalled, vec![101]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].pid, 100);
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_not_freed() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100).set_pid_lookup_available(false);

        let report = reaper(&host).reclaim(3002).await;
        assert!(!report.freed);
        assert!(host.signalled().is_empty());
        assert!(host.is_occupied(3002));
    }
}
