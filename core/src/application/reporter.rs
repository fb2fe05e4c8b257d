//! Read-only snapshot of every configured service's port situation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::adapters::{PortScanner, SocketBinder};
use crate::config::PortConfig;
use crate::domain::{PortConflict, PortReport, ServicePortStatus};
use crate::ports::{PortScannerPort, SocketBinderPort};

use super::{PortAllocator, PortProbe};

/// Builds [`PortReport`]s. Never terminates processes.
#[derive(Debug, Clone)]
pub struct PortReporter<S = PortScanner, B = SocketBinder> {
    config: Arc<PortConfig>,
    probe: PortProbe<S, B>,
    allocator: PortAllocator<S, B>,
}

impl PortReporter {
    /// Reporter backed by the host's real tooling and sockets.
    pub fn system(config: impl Into<Arc<PortConfig>>) -> Self {
        let config = config.into();
        let probe = PortProbe::system(config.operation_timeout());
        let allocator = PortAllocator::new(config.clone(), probe.clone(), SocketBinder::new());
        Self::new(config, probe, allocator)
    }
}

impl<S: PortScannerPort, B: SocketBinderPort> PortReporter<S, B> {
    pub fn new(
        config: Arc<PortConfig>,
        probe: PortProbe<S, B>,
        allocator: PortAllocator<S, B>,
    ) -> Self {
        Self {
            config,
            probe,
            allocator,
        }
    }

    pub async fn generate_report(&self) -> PortReport {
        let mut services = Vec::with_capacity(self.config.services.len());
        let mut conflicts = Vec::new();

        for spec in &self.config.services {
            let preferred = spec.preferred_port;
            let preferred_available =
                !self.config.is_reserved(preferred) && !self.probe.is_port_in_use(preferred).await;

            let recommended_port = match self.allocator.find_available_port(&spec.name).await {
                Ok(port) => Some(port),
                Err(e) => {
                    warn!(service = %spec.name, error = %e, "No port available for service");
                    None
                }
            };

            let conflict = recommended_port != Some(preferred);
            if conflict {
                conflicts.push(PortConflict {
                    service: spec.name.clone(),
                    preferred,
                    recommended: recommended_port,
                });
            }

            services.push(ServicePortStatus {
                name: spec.name.clone(),
                description: spec.description.clone(),
                preferred,
                preferred_available,
                recommended_port,
                fallback_ports: spec.fallback_ports.clone(),
                conflict,
            });
        }

        debug!(
            services = services.len(),
            conflicts = conflicts.len(),
            "Generated port report"
        );

        let recommendations = self.recommendations(&conflicts);
        PortReport {
            generated_at: Utc::now(),
            services,
            conflicts,
            recommendations,
            reserved_ports: self.config.reserved_ports.iter().collect(),
        }
    }

    fn recommendations(&self, conflicts: &[PortConflict]) -> Vec<String> {
        if conflicts.is_empty() {
            return Vec::new();
        }

        let mut recommendations: Vec<String> = conflicts
            .iter()
            .map(|c| {
                if self.config.is_reserved(c.preferred) {
                    format!(
                        "Service '{}' prefers reserved port {}; choose another preferred port",
                        c.service, c.preferred
                    )
                } else {
                    format!(
                        "Port {} for service '{}' is in use; inspect it with `lsof -i :{}`",
                        c.preferred, c.service, c.preferred
                    )
                }
            })
            .collect();

        recommendations.push(format!(
            "Run batch resolution (resolve-all) to move {} conflicting service(s) to alternative ports",
            conflicts.len()
        ));
        recommendations.push(
            "Run batch resolution with --force to reclaim preferred ports from their current holders"
                .to_string(),
        );
        recommendations
    }
}
