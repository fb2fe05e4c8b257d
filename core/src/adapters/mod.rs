//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems; `memory` holds
//! a simulated host for tests.

pub mod binder;
pub mod killer;
pub mod memory;
pub mod scanner;

// Re-export main types for convenience
pub use binder::SocketBinder;
pub use killer::ProcessKiller;
pub use memory::InMemoryHost;
pub use scanner::PortScanner;
