//! Per-service port conflict resolution.
//!
//! Each call runs the same sequence against live host state:
//!
//! 1. **Check preferred**: probe the preferred port; free means done.
//! 2. **Reclaim** (forced only): terminate the preferred port's occupants.
//! 3. **Fallback**: let the allocator re-walk preferred, fallbacks and the
//!    dynamic range.
//!
//! Nothing is remembered between calls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::adapters::{PortScanner, ProcessKiller, SocketBinder};
use crate::config::PortConfig;
use crate::domain::{
    PortProbeResult, ReclaimReport, ResolutionMethod, ResolutionOutcome, ServiceResolution,
};
use crate::error::Result;
use crate::ports::{PortScannerPort, ProcessKillerPort, SocketBinderPort};

use super::{PortAllocator, PortProbe, PortReporter, ProcessReaper};

/// Entry point deciding which port each registered service binds to.
#[derive(Debug, Clone)]
pub struct ConflictResolver<S = PortScanner, K = ProcessKiller, B = SocketBinder> {
    config: Arc<PortConfig>,
    probe: PortProbe<S, B>,
    reaper: ProcessReaper<S, K, B>,
    allocator: PortAllocator<S, B>,
}

impl ConflictResolver {
    /// Resolver backed by the host's real tooling, signals and sockets.
    pub fn new(config: impl Into<Arc<PortConfig>>) -> Self {
        Self::with_adapters(
            config,
            PortScanner::new(),
            ProcessKiller::new(),
            SocketBinder::new(),
        )
    }
}

impl<S, K, B> ConflictResolver<S, K, B>
where
    S: PortScannerPort + Clone,
    K: ProcessKillerPort + Clone,
    B: SocketBinderPort + Clone,
{
    /// Resolver over caller-supplied host capabilities.
    pub fn with_adapters(
        config: impl Into<Arc<PortConfig>>,
        scanner: S,
        killer: K,
        binder: B,
    ) -> Self {
        let config = config.into();
        let timeout = config.operation_timeout();

        let probe = PortProbe::new(scanner.clone(), binder.clone(), timeout);
        let reaper = ProcessReaper::new(
            scanner,
            killer,
            probe.clone(),
            config.settle_delay(),
            timeout,
        );
        let allocator = PortAllocator::new(config.clone(), probe.clone(), binder);

        Self {
            config,
            probe,
            reaper,
            allocator,
        }
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Read-only reporter sharing this resolver's configuration and host.
    pub fn reporter(&self) -> PortReporter<S, B> {
        PortReporter::new(self.config.clone(), self.probe.clone(), self.allocator.clone())
    }

    /// Probe a single port.
    pub async fn check_port(&self, port: u16) -> PortProbeResult {
        self.probe.probe(port).await
    }

    /// Terminate whatever holds `port`.
    ///
    /// Without `force`, holders get SIGTERM and a short grace period first.
    pub async fn free_port(&self, port: u16, force: bool) -> ReclaimReport {
        if force {
            self.reaper.reclaim(port).await
        } else {
            self.reaper.reclaim_gracefully(port).await
        }
    }

    /// Decide the port for `service`.
    ///
    /// With `force_kill`, an occupied preferred port is reclaimed before
    /// falling back. Fails with `UnknownService` for unregistered names and
    /// `ResourceExhausted` when even the dynamic range is unavailable.
    pub async fn resolve(&self, service: &str, force_kill: bool) -> Result<ResolutionOutcome> {
        self.resolve_claimed(service, force_kill, &BTreeSet::new())
            .await
    }

    /// Resolve every registered service independently.
    ///
    /// The map always has one entry per registered service; failures are
    /// recorded in place instead of aborting the batch. Ports handed out
    /// earlier in the batch are not handed out again.
    pub async fn resolve_all(&self, force_kill: bool) -> BTreeMap<String, ServiceResolution> {
        let mut results = BTreeMap::new();
        let mut claimed = BTreeSet::new();

        for spec in &self.config.services {
            let entry = match self.resolve_claimed(&spec.name, force_kill, &claimed).await {
                Ok(outcome) => {
                    claimed.insert(outcome.resolved_port);
                    ServiceResolution::Resolved(outcome)
                }
                Err(e) => {
                    error!(service = %spec.name, error = %e, "Failed to resolve port");
                    ServiceResolution::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.insert(spec.name.clone(), entry);
        }

        results
    }

    async fn resolve_claimed(
        &self,
        service: &str,
        force_kill: bool,
        claimed: &BTreeSet<u16>,
    ) -> Result<ResolutionOutcome> {
        let spec = self.config.require_service(service)?;
        let preferred = spec.preferred_port;
        let mut conflicts = Vec::new();

        if self.config.is_reserved(preferred) {
            warn!(service = service, port = preferred, "Preferred port is reserved");
        } else if claimed.contains(&preferred) {
            conflicts.push(preferred);
        } else {
            if !self.probe.is_port_in_use(preferred).await {
                info!(service = service, port = preferred, "Using preferred port");
                return Ok(ResolutionOutcome {
                    service_name: spec.name.clone(),
                    resolved_port: preferred,
                    method: ResolutionMethod::Preferred,
                    conflicts_encountered: conflicts,
                });
            }
            conflicts.push(preferred);

            if force_kill {
                warn!(service = service, port = preferred, "Preferred port busy, reclaiming");
                if self.reaper.free_port(preferred).await {
                    info!(service = service, port = preferred, "Reclaimed preferred port");
                    return Ok(ResolutionOutcome {
                        service_name: spec.name.clone(),
                        resolved_port: preferred,
                        method: ResolutionMethod::ForcedReclaim,
                        conflicts_encountered: conflicts,
                    });
                }
                warn!(service = service, port = preferred, "Reclaim failed, falling back");
            }
        }

        let allocation = self.allocator.allocate_excluding(service, claimed).await?;
        for port in allocation.conflicts {
            if !conflicts.contains(&port) {
                conflicts.push(port);
            }
        }

        let method = ResolutionMethod::from(allocation.source);
        info!(
            service = service,
            port = allocation.port,
            method = %method,
            "Resolved port"
        );
        Ok(ResolutionOutcome {
            service_name: spec.name.clone(),
            resolved_port: allocation.port,
            method,
            conflicts_encountered: conflicts,
        })
    }
}
