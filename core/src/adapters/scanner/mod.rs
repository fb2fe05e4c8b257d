//! Port scanner adapters.
//!
//! Platform-specific implementations of socket-table inspection.

#[cfg(target_os = "macos")]
mod darwin;

#[cfg(target_os = "linux")]
mod linux;

mod utils;

use std::collections::HashSet;

use crate::error::Result;
use crate::ports::PortScannerPort;

/// The main port scanner that uses platform-specific implementations.
#[derive(Clone, Copy)]
pub struct PortScanner {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinScanner,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxScanner,

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    inner: UnsupportedScanner,
}

impl PortScanner {
    /// Create a new port scanner for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinScanner::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxScanner::new(),

            #[cfg(not(any(target_os = "macos", target_os = "linux")))]
            inner: UnsupportedScanner,
        }
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PortScannerPort for PortScanner {
    async fn listening_ports(&self) -> Result<HashSet<u16>> {
        self.inner.listening_ports().await
    }

    async fn pids_on_port(&self, port: u16) -> Result<Vec<u32>> {
        self.inner.pids_on_port(port).await
    }
}

/// Internal trait for platform-specific implementations.
trait Scanner: Send + Sync {
    fn listening_ports(&self) -> impl std::future::Future<Output = Result<HashSet<u16>>> + Send;

    fn pids_on_port(&self, port: u16)
        -> impl std::future::Future<Output = Result<Vec<u32>>> + Send;
}

/// Hosts without supported tooling; the probe falls back to binding.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
#[derive(Clone, Copy)]
struct UnsupportedScanner;

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl Scanner for UnsupportedScanner {
    async fn listening_ports(&self) -> Result<HashSet<u16>> {
        Err(crate::error::Error::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }

    async fn pids_on_port(&self, _port: u16) -> Result<Vec<u32>> {
        Err(crate::error::Error::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
