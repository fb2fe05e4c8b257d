//! In-memory host adapter.
//!
//! Simulates a socket table, process ownership and signal delivery so the
//! resolver can be exercised deterministically without touching real
//! sockets. One handle implements every capability trait; clones share state.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::ports::{PortScannerPort, ProcessKillerPort, SocketBinderPort};

/// First port handed out by the simulated ephemeral range.
const EPHEMERAL_START: u16 = 49152;

#[derive(Debug)]
struct HostState {
    /// port -> owning PIDs
    listeners: BTreeMap<u16, Vec<u32>>,
    running: HashSet<u32>,
    /// PIDs whose signals are rejected.
    stubborn: HashSet<u32>,
    scanner_available: bool,
    pid_lookup_available: bool,
    scanner_stall: Option<Duration>,
    bind_errors: HashMap<u16, io::ErrorKind>,
    scripted_ephemeral: VecDeque<u16>,
    next_ephemeral: u16,
    ephemeral_exhausted: bool,
    /// (pid, forced) per termination signal.
    signals: Vec<(u32, bool)>,
    bind_attempts: Vec<u16>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            listeners: BTreeMap::new(),
            running: HashSet::new(),
            stubborn: HashSet::new(),
            scanner_available: true,
            pid_lookup_available: true,
            scanner_stall: None,
            bind_errors: HashMap::new(),
            scripted_ephemeral: VecDeque::new(),
            next_ephemeral: EPHEMERAL_START,
            ephemeral_exhausted: false,
            signals: Vec::new(),
            bind_attempts: Vec::new(),
        }
    }
}

/// Simulated host. Cheap to clone; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `port` as listened on by `pid`.
    pub fn occupy(&self, port: u16, pid: u32) -> &Self {
        let mut state = self.state.lock();
        let owners = state.listeners.entry(port).or_default();
        if !owners.contains(&pid) {
            owners.push(pid);
        }
        state.running.insert(pid);
        self
    }

    /// Close every listener on `port` without touching its owners.
    pub fn release(&self, port: u16) -> &Self {
        self.state.lock().listeners.remove(&port);
        self
    }

    pub fn is_occupied(&self, port: u16) -> bool {
        self.state.lock().listeners.contains_key(&port)
    }

    pub fn is_running(&self, pid: u32) -> bool {
        self.state.lock().running.contains(&pid)
    }

    /// Make `pid` reject termination signals.
    pub fn make_stubborn(&self, pid: u32) -> &Self {
        self.state.lock().stubborn.insert(pid);
        self
    }

    /// Simulate missing `ss`/`netstat`/`lsof` listing tools.
    pub fn set_scanner_available(&self, available: bool) -> &Self {
        self.state.lock().scanner_available = available;
        self
    }

    /// Simulate missing port-to-PID lookup tooling.
    pub fn set_pid_lookup_available(&self, available: bool) -> &Self {
        self.state.lock().pid_lookup_available = available;
        self
    }

    /// Make socket-table listings hang for `stall`.
    pub fn stall_scanner(&self, stall: Duration) -> &Self {
        self.state.lock().scanner_stall = Some(stall);
        self
    }

    /// Make binds on `port` fail with `kind` (e.g. `PermissionDenied`).
    pub fn fail_bind(&self, port: u16, kind: io::ErrorKind) -> &Self {
        self.state.lock().bind_errors.insert(port, kind);
        self
    }

    /// Queue the next port returned by `bind_ephemeral`.
    pub fn script_ephemeral(&self, port: u16) -> &Self {
        self.state.lock().scripted_ephemeral.push_back(port);
        self
    }

    /// Make `bind_ephemeral` fail.
    pub fn exhaust_ephemeral(&self) -> &Self {
        self.state.lock().ephemeral_exhausted = true;
        self
    }

    /// PIDs that received a termination signal, in order.
    pub fn signalled(&self) -> Vec<u32> {
        self.state.lock().signals.iter().map(|(pid, _)| *pid).collect()
    }

    /// Termination signals as `(pid, forced)`, in order.
    pub fn signals(&self) -> Vec<(u32, bool)> {
        self.state.lock().signals.clone()
    }

    /// Ports passed to `bind`, in order.
    pub fn bind_attempts(&self) -> Vec<u16> {
        self.state.lock().bind_attempts.clone()
    }
}

impl PortScannerPort for InMemoryHost {
    async fn listening_ports(&self) -> Result<HashSet<u16>> {
        let (available, stall) = {
            let state = self.state.lock();
            (state.scanner_available, state.scanner_stall)
        };

        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        if !available {
            return Err(Error::CommandFailed("Failed to run ss: not found".to_string()));
        }

        Ok(self.state.lock().listeners.keys().copied().collect())
    }

    async fn pids_on_port(&self, port: u16) -> Result<Vec<u32>> {
        let state = self.state.lock();
        if !state.pid_lookup_available {
            return Err(Error::CommandFailed("Failed to run lsof: not found".to_string()));
        }
        Ok(state.listeners.get(&port).cloned().unwrap_or_default())
    }
}

impl ProcessKillerPort for InMemoryHost {
    async fn kill(&self, pid: u32, force: bool) -> Result<bool> {
        let mut state = self.state.lock();
        state.signals.push((pid, force));

        if state.stubborn.contains(&pid) {
            return Err(Error::PermissionDenied(format!(
                "not allowed to signal process {}",
                pid
            )));
        }

        state.running.remove(&pid);
        for owners in state.listeners.values_mut() {
            owners.retain(|owner| *owner != pid);
        }
        state.listeners.retain(|_, owners| !owners.is_empty());
        Ok(true)
    }
}

impl SocketBinderPort for InMemoryHost {
    async fn bind(&self, port: u16) -> io::Result<()> {
        let mut state = self.state.lock();
        state.bind_attempts.push(port);

        if let Some(kind) = state.bind_errors.get(&port) {
            return Err(io::Error::from(*kind));
        }
        if state.listeners.contains_key(&port) {
            return Err(io::Error::from(io::ErrorKind::AddrInUse));
        }
        Ok(())
    }

    async fn bind_ephemeral(&self) -> io::Result<u16> {
        let mut state = self.state.lock();
        if state.ephemeral_exhausted {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no ephemeral ports left",
            ));
        }
        if let Some(port) = state.scripted_ephemeral.pop_front() {
            return Ok(port);
        }

        for _ in EPHEMERAL_START..=u16::MAX {
            let port = state.next_ephemeral;
            state.next_ephemeral = port.checked_add(1).unwrap_or(EPHEMERAL_START);
            if !state.listeners.contains_key(&port) {
                return Ok(port);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "every ephemeral port is occupied",
        ))
    }
}
