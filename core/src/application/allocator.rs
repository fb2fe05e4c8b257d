//! Port allocation from a service's preference list.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::adapters::{PortScanner, SocketBinder};
use crate::config::PortConfig;
use crate::domain::{Allocation, AllocationSource};
use crate::error::{Error, Result};
use crate::ports::{PortScannerPort, SocketBinderPort};

use super::PortProbe;

/// How many OS-assigned ports to inspect before giving up.
const MAX_DYNAMIC_ATTEMPTS: usize = 8;

/// Finds the first free, non-reserved port for a service.
#[derive(Debug, Clone)]
pub struct PortAllocator<S = PortScanner, B = SocketBinder> {
    config: Arc<PortConfig>,
    probe: PortProbe<S, B>,
    binder: B,
    timeout: Duration,
}

impl PortAllocator {
    /// Allocator backed by the host's real tooling and sockets.
    pub fn system(config: impl Into<Arc<PortConfig>>) -> Self {
        let config = config.into();
        let timeout = config.operation_timeout();
        Self::new(config, PortProbe::system(timeout), SocketBinder::new())
    }
}

impl<S: PortScannerPort, B: SocketBinderPort> PortAllocator<S, B> {
    pub fn new(config: impl Into<Arc<PortConfig>>, probe: PortProbe<S, B>, binder: B) -> Self {
        let config = config.into();
        let timeout = config.operation_timeout();
        Self {
            config,
            probe,
            binder,
            timeout,
        }
    }

    /// First free candidate for `service`, or an OS-assigned port.
    pub async fn find_available_port(&self, service: &str) -> Result<u16> {
        Ok(self.allocate(service).await?.port)
    }

    /// Walk `[preferred, ...fallbacks]`, skipping reserved ports.
    ///
    /// Falls back to [`find_dynamic_port`](Self::find_dynamic_port) when
    /// every candidate is reserved or occupied.
    pub async fn allocate(&self, service: &str) -> Result<Allocation> {
        self.allocate_excluding(service, &BTreeSet::new()).await
    }

    /// Like [`allocate`](Self::allocate), treating `claimed` ports as taken.
    pub(crate) async fn allocate_excluding(
        &self,
        service: &str,
        claimed: &BTreeSet<u16>,
    ) -> Result<Allocation> {
        let spec = self.config.require_service(service)?;
        let mut conflicts = Vec::new();

        for port in spec.candidates() {
            if self.config.is_reserved(port) {
                debug!(service = service, port = port, "Skipping reserved port");
                continue;
            }
            if claimed.contains(&port) || self.probe.is_port_in_use(port).await {
                debug!(service = service, port = port, "Candidate port occupied");
                conflicts.push(port);
                continue;
            }

            let source = if port == spec.preferred_port {
                AllocationSource::Preferred
            } else {
                AllocationSource::Fallback
            };
            debug!(service = service, port = port, source = ?source, "Allocated port");
            return Ok(Allocation {
                port,
                source,
                conflicts,
            });
        }

        warn!(
            service = service,
            conflicts = ?conflicts,
            "All configured ports unavailable, requesting a dynamic port"
        );
        let port = self
            .dynamic_port_avoiding(|port| spec.is_candidate(port) || claimed.contains(&port))
            .await?;
        info!(service = service, port = port, "Allocated dynamic port");

        Ok(Allocation {
            port,
            source: AllocationSource::Dynamic,
            conflicts,
        })
    }

    /// Ask the OS for an ephemeral port (bind port 0, read it back, close).
    pub async fn find_dynamic_port(&self) -> Result<u16> {
        self.dynamic_port_avoiding(|_| false).await
    }

    async fn dynamic_port_avoiding(&self, avoid: impl Fn(u16) -> bool) -> Result<u16> {
        for attempt in 1..=MAX_DYNAMIC_ATTEMPTS {
            let port = match timeout(self.timeout, self.binder.bind_ephemeral()).await {
                Ok(Ok(port)) => port,
                Ok(Err(e)) => {
                    return Err(Error::ResourceExhausted(format!(
                        "OS refused an ephemeral port: {}",
                        e
                    )))
                }
                Err(_) => {
                    return Err(Error::ResourceExhausted(
                        "Timed out waiting for an ephemeral port".to_string(),
                    ))
                }
            };

            if port == 0 || self.config.is_reserved(port) || avoid(port) {
                debug!(attempt = attempt, port = port, "Rejecting ephemeral port");
                continue;
            }
            return Ok(port);
        }

        Err(Error::ResourceExhausted(format!(
            "No usable ephemeral port after {} attempts",
            MAX_DYNAMIC_ATTEMPTS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryHost;
    use crate::domain::ServicePortSpec;

    fn allocator(
        host: &InMemoryHost,
        config: PortConfig,
    ) -> PortAllocator<InMemoryHost, InMemoryHost> {
        let probe = PortProbe::new(host.clone(), host.clone(), config.operation_timeout());
        PortAllocator::new(config, probe, host.clone())
    }

    fn main_config(reserved: &[u16]) -> PortConfig {
        PortConfig::new(
            [ServicePortSpec::new("main", 3002, [3001, 3003], "Main API server")],
            reserved.iter().copied(),
        )
    }

    #[tokio::test]
    async fn test_prefers_preferred_port() {
        let host = InMemoryHost::new();
        let allocation = allocator(&host, main_config(&[])).allocate("main").await.unwrap();

        assert_eq!(allocation.port, 3002);
        assert_eq!(allocation.source, AllocationSource::Preferred);
        assert!(allocation.conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_first_free_fallback_in_order() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100);

        let allocation = allocator(&host, main_config(&[])).allocate("main").await.unwrap();
        assert_eq!(allocation.port, 3001);
        assert_eq!(allocation.source, AllocationSource::Fallback);
        assert_eq!(allocation.conflicts, vec![3002]);
    }

    #[tokio::test]
    async fn test_skips_reserved_even_if_free() {
        let host = InMemoryHost::new();
        host.occupy(3002, 100);

        let port = allocator(&host, main_config(&[3001]))
            .find_available_port("main")
            .await
            .unwrap();
        assert_eq!(port, 3003);
    }

    #[tokio::test]
    async fn test_dynamic_when_all_taken() {
        let host = InMemoryHost::new();
        host.occupy(3002, 1).occupy(3001, 2).occupy(3003, 3);

        let allocation = allocator(&host, main_config(&[])).allocate("main").await.unwrap();
        assert_eq!(allocation.source, AllocationSource::Dynamic);
        assert!(![3002, 3001, 3003].contains(&allocation.port));
        assert_eq!(allocation.conflicts, vec![3002, 3001, 3003]);
    }

    #[tokio::test]
    async fn test_dynamic_rejects_reserved_and_candidates() {
        let host = InMemoryHost::new();
        host.occupy(3002, 1).occupy(3001, 2).occupy(3003, 3);
        host.script_ephemeral(22).script_ephemeral(3001).script_ephemeral(50000);

        let port = allocator(&host, main_config(&[22]))
            .find_available_port("main")
            .await
            .unwrap();
        assert_eq!(port, 50000);
    }

    #[tokio::test]
    async fn test_dynamic_exhausted() {
        let host = InMemoryHost::new();
        host.occupy(3002, 1).occupy(3001, 2).occupy(3003, 3).exhaust_ephemeral();

        let result = allocator(&host, main_config(&[])).find_available_port("main").await;
        assert!(matches!(result, Err(Error::ResourceExhausted(_))));
    }

    #[tokio::test]
    async fn test_find_dynamic_port() {
        let host = InMemoryHost::new();
        let port = allocator(&host, main_config(&[]))
            .find_dynamic_port()
            .await
            .unwrap();
        assert_ne!(port, 0);
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let host = InMemoryHost::new();
        let result = allocator(&host, main_config(&[])).find_available_port("ghost").await;
        assert!(matches!(result, Err(Error::UnknownService { .. })));
    }

    #[tokio::test]
    async fn test_claimed_ports_count_as_taken() {
        let host = InMemoryHost::new();
        let claimed = BTreeSet::from([3002]);

        let allocation = allocator(&host, main_config(&[]))
            .allocate_excluding("main", &claimed)
            .await
            .unwrap();
        assert_eq!(allocation.port, 3001);
        assert_eq!(allocation.conflicts, vec![3002]);
    }
}
