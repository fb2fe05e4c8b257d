//! Error types for the portguard-core library.

use thiserror::Error;

/// Result type alias for portguard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during port probing, reclaiming and allocation.
///
/// Only [`Error::UnknownService`] and [`Error::ResourceExhausted`] ever reach
/// callers of the resolver. The remaining variants describe failures of the
/// host's introspection tooling and are absorbed by the probe and the reaper.
#[derive(Error, Debug)]
pub enum Error {
    /// No port configuration is registered for the requested service.
    #[error("Configuration error: no port configuration registered for service '{service}'")]
    UnknownService { service: String },

    /// The OS refused to hand out an ephemeral port.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// Failed to kill a process.
    #[error("Failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    /// The process disappeared before it could be signalled.
    #[error("Process with PID {0} not found")]
    ProcessNotFound(u32),

    /// Permission denied for an operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    pub(crate) fn unknown_service(service: impl Into<String>) -> Self {
        Self::UnknownService {
            service: service.into(),
        }
    }
}
