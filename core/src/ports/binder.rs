//! Socket binder port (interface).

use std::io;

/// Port for binding TCP listeners.
///
/// Both operations release the listener before returning; nothing here
/// holds a port on the caller's behalf.
pub trait SocketBinderPort: Send + Sync {
    /// Bind `0.0.0.0:port` and close it again.
    ///
    /// `io::ErrorKind::AddrInUse` means the port is occupied.
    fn bind(&self, port: u16) -> impl std::future::Future<Output = io::Result<()>> + Send;

    /// Bind port 0 and return the port number the OS assigned.
    fn bind_ephemeral(&self) -> impl std::future::Future<Output = io::Result<u16>> + Send;
}
