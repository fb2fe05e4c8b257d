//! Process killer adapter using POSIX signals.
//!
//! - SIGTERM (15): graceful termination request
//! - SIGKILL (9): immediate forced termination

#[cfg(unix)]
use std::time::Duration;

#[cfg(unix)]
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ports::ProcessKillerPort;

/// Grace period to wait between SIGTERM and SIGKILL.
#[cfg(unix)]
const GRACEFUL_KILL_TIMEOUT_MS: u64 = 500;

/// Signal-based process killer for the current platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessKiller;

impl ProcessKiller {
    pub fn new() -> Self {
        Self
    }

    /// Reject PIDs that would address a process group or ourselves.
    fn checked_pid(pid: u32) -> Result<i32> {
        if pid == 0 || pid > i32::MAX as u32 {
            return Err(Error::KillFailed {
                pid,
                reason: "not a valid process id".to_string(),
            });
        }
        if pid == std::process::id() {
            return Err(Error::KillFailed {
                pid,
                reason: "refusing to terminate the current process".to_string(),
            });
        }
        Ok(pid as i32)
    }

    /// Check if a process is still running.
    ///
    /// Signal 0 checks existence; EPERM means it exists under another user.
    #[cfg(unix)]
    pub fn is_running(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if pid == 0 || pid > i32::MAX as u32 {
            return false;
        }
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(unix)]
    fn send_signal(&self, pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let raw = Self::checked_pid(pid)?;
        debug!(pid = pid, signal = %signal, "Sending signal to process");

        match kill(Pid::from_raw(raw), signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(Error::ProcessNotFound(pid)),
            Err(Errno::EPERM) => {
                warn!(pid = pid, "Permission denied to kill process");
                Err(Error::PermissionDenied(format!(
                    "not allowed to signal process {}",
                    pid
                )))
            }
            Err(errno) => Err(Error::KillFailed {
                pid,
                reason: errno.desc().to_string(),
            }),
        }
    }

    #[cfg(unix)]
    async fn kill_force(&self, pid: u32) -> Result<bool> {
        use nix::sys::signal::Signal;

        match self.send_signal(pid, Signal::SIGKILL) {
            Ok(()) => Ok(true),
            // Process already gone - consider this a success
            Err(Error::ProcessNotFound(_)) => {
                debug!(pid = pid, "Process not found during force kill");
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(unix)]
    async fn kill_gracefully(&self, pid: u32) -> Result<bool> {
        use nix::sys::signal::Signal;

        match self.send_signal(pid, Signal::SIGTERM) {
            Ok(()) => {}
            Err(Error::ProcessNotFound(_)) => return Ok(true),
            Err(e) => return Err(e),
        }

        tokio::time::sleep(Duration::from_millis(GRACEFUL_KILL_TIMEOUT_MS)).await;

        if !self.is_running(pid) {
            debug!(pid = pid, "Process terminated after SIGTERM");
            return Ok(true);
        }

        debug!(pid = pid, "Process still running, sending SIGKILL");
        self.kill_force(pid).await
    }
}

#[cfg(unix)]
impl ProcessKillerPort for ProcessKiller {
    async fn kill(&self, pid: u32, force: bool) -> Result<bool> {
        if force {
            self.kill_force(pid).await
        } else {
            self.kill_gracefully(pid).await
        }
    }
}

#[cfg(not(unix))]
impl ProcessKillerPort for ProcessKiller {
    async fn kill(&self, pid: u32, _force: bool) -> Result<bool> {
        Self::checked_pid(pid)?;
        Err(Error::UnsupportedPlatform(format!(
            "cannot signal process {} on {}",
            pid,
            std::env::consts::OS
        )))
    }
}
