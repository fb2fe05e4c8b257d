//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the capabilities the application layer needs from the
//! host: socket-table inspection, process termination and socket binding.
//! Implementations live in `adapters`.

mod binder;
mod killer;
mod scanner;

pub use binder::SocketBinderPort;
pub use killer::ProcessKillerPort;
pub use scanner::PortScannerPort;
