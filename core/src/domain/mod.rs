//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod probe;
mod report;
mod resolution;
mod service;

// Re-export all domain types
pub use probe::{PortProbeResult, ProbeStrategy};
pub use report::{PortConflict, PortReport, ServicePortStatus};
pub use resolution::{
    Allocation, AllocationSource, ReclaimFailure, ReclaimReport, ResolutionMethod,
    ResolutionOutcome, ServiceResolution,
};
pub use service::{ReservedPorts, ServicePortSpec};
