//! PortGuard Core Library
//!
//! Decides which TCP port each named service should bind to.
//! Provides functionality to:
//! - Probe whether a port is bound on the local host
//! - Reclaim a port by terminating the processes holding it
//! - Allocate a free port from a service's preference list, falling back
//!   to an OS-assigned port
//! - Resolve one or all registered services and report conflicts
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Platform Support
//! - Linux: Uses `ss` or `netstat`, and `lsof` for PID lookup
//! - macOS: Uses `lsof` or `netstat`
//! - Elsewhere: Falls back to bind attempts; reclaiming is unavailable

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    Allocation, AllocationSource, PortConflict, PortProbeResult, PortReport, ProbeStrategy,
    ReclaimFailure, ReclaimReport, ReservedPorts, ResolutionMethod, ResolutionOutcome,
    ServicePortSpec, ServicePortStatus, ServiceResolution,
};

// Re-export other commonly used types
pub use adapters::{InMemoryHost, PortScanner, ProcessKiller, SocketBinder};
pub use application::{ConflictResolver, PortAllocator, PortProbe, PortReporter, ProcessReaper};
pub use config::{ConfigStore, PortConfig};
pub use error::{Error, Result};
