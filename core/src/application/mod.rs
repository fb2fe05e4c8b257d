//! Application layer - Use case services.
//!
//! This module contains application services that orchestrate
//! domain logic and adapter interactions.
//!
//! Services are designed to be thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Return domain types as outputs
//!
//! [`ConflictResolver`] is the entry point; the other services are its steps.

mod allocator;
mod probe;
mod reaper;
mod reporter;
mod resolver;

pub use allocator::PortAllocator;
pub use probe::PortProbe;
pub use reaper::ProcessReaper;
pub use reporter::PortReporter;
pub use resolver::ConflictResolver;
