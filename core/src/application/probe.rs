//! Port occupancy probe.
//!
//! Asks the socket table first; when the tooling is missing or fails, falls
//! back to binding the port directly and releasing it straight away.

use std::io;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::adapters::{PortScanner, SocketBinder};
use crate::domain::{PortProbeResult, ProbeStrategy};
use crate::ports::{PortScannerPort, SocketBinderPort};

/// Determines whether a TCP port is bound on the local host.
#[derive(Debug, Clone)]
pub struct PortProbe<S = PortScanner, B = SocketBinder> {
    scanner: S,
    binder: B,
    timeout: Duration,
}

impl PortProbe {
    /// Probe backed by the host's real tooling and sockets.
    pub fn system(timeout: Duration) -> Self {
        Self::new(PortScanner::new(), SocketBinder::new(), timeout)
    }
}

impl<S: PortScannerPort, B: SocketBinderPort> PortProbe<S, B> {
    pub fn new(scanner: S, binder: B, timeout: Duration) -> Self {
        Self {
            scanner,
            binder,
            timeout,
        }
    }

    /// Probe `port`. Never fails; an undecidable port is reported occupied.
    pub async fn probe(&self, port: u16) -> PortProbeResult {
        match timeout(self.timeout, self.scanner.listening_ports()).await {
            Ok(Ok(listening)) => {
                let in_use = listening.contains(&port);
                debug!(port = port, in_use = in_use, "Socket table probe");
                return if in_use {
                    PortProbeResult::in_use(port, ProbeStrategy::SocketTable)
                } else {
                    PortProbeResult::free(port, ProbeStrategy::SocketTable)
                };
            }
            Ok(Err(e)) => {
                debug!(port = port, error = %e, "Socket table unavailable, trying bind");
            }
            Err(_) => {
                warn!(
                    port = port,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Socket table listing timed out, trying bind"
                );
            }
        }

        match timeout(self.timeout, self.binder.bind(port)).await {
            Ok(Ok(())) => {
                debug!(port = port, "Bind probe succeeded, port is free");
                PortProbeResult::free(port, ProbeStrategy::BindAttempt)
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!(port = port, "Bind probe hit address in use");
                PortProbeResult::in_use(port, ProbeStrategy::BindAttempt)
            }
            Ok(Err(e)) => {
                warn!(port = port, error = %e, "Probe inconclusive, assuming port is occupied");
                PortProbeResult::inconclusive(port)
            }
            Err(_) => {
                warn!(port = port, "Bind probe timed out, assuming port is occupied");
                PortProbeResult::inconclusive(port)
            }
        }
    }

    pub async fn is_port_in_use(&self, port: u16) -> bool {
        self.probe(port).await.in_use
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryHost;

    fn probe(host: &InMemoryHost) -> PortProbe<InMemoryHost, InMemoryHost> {
        PortProbe::new(host.clone(), host.clone(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_socket_table_strategy() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100);
        let probe = probe(&host);

        let result = probe.probe(3002).await;
        assert!(result.in_use);
        assert_eq!(result.strategy, ProbeStrategy::SocketTable);

        let result = probe.probe(3001).await;
        assert!(!result.in_use);
        assert_eq!(result.strategy, ProbeStrategy::SocketTable);

        // The socket table answered, so nothing was bound
        assert!(host.bind_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_bind() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100).set_scanner_available(false);
        let probe = probe(&host);

        let result = probe.probe(3002).await;
        assert!(result.in_use);
        assert_eq!(result.strategy, ProbeStrategy::BindAttempt);

        assert!(!probe.is_port_in_use(3001).await);
        assert_eq!(host.bind_attempts(), vec![3002, 3001]);
    }

    #[tokio::test]
    async fn test_inconclusive_assumes_occupied() {
        let host = InMemoryHost::new();
        host.set_scanner_available(false)
            .fail_bind(80, io::ErrorKind::PermissionDenied);

        let result = probe(&host).probe(80).await;
        assert!(result.in_use);
        assert!(result.is_inconclusive());
    }

    #[tokio::test]
    async fn test_scanner_timeout_falls_back() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100).stall_scanner(Duration::from_secs(5));
        let probe = PortProbe::new(host.clone(), host.clone(), Duration::from_millis(20));

        let result = probe.probe(3002).await;
        assert!(result.in_use);
        assert_eq!(result.strategy, ProbeStrategy::BindAttempt);
    }

    #[tokio::test]
    async fn test_probe_is_never_cached() {
        let host = InMemoryHost::new();
        let probe = probe(&host);

        assert!(!probe.is_port_in_use(3002).await);
        host.occupy(3002, 100);
        assert!(probe.is_port_in_use(3002).await);
        host.release(3002);
        assert!(!probe.is_port_in_use(3002).await);
    }
}
