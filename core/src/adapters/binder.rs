//! Socket binder adapter backed by real TCP listeners.
//!
//! Binds run on tokio's blocking pool so a caller's timeout can abandon them.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use crate::ports::SocketBinderPort;

/// Binds real sockets on all IPv4 interfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketBinder;

impl SocketBinder {
    pub fn new() -> Self {
        Self
    }

    fn any_addr(port: u16) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
    }
}

/// Bind `port`, returning the bound port number; the listener is closed
/// before this returns.
async fn bind_and_release(port: u16) -> io::Result<u16> {
    tokio::task::spawn_blocking(move || -> io::Result<u16> {
        let listener = TcpListener::bind(SocketBinder::any_addr(port))?;
        let bound = listener.local_addr()?.port();
        drop(listener);
        Ok(bound)
    })
    .await
    .map_err(io::Error::other)?
}

impl SocketBinderPort for SocketBinder {
    async fn bind(&self, port: u16) -> io::Result<()> {
        bind_and_release(port).await.map(|_| ())
    }

    async fn bind_ephemeral(&self) -> io::Result<u16> {
        bind_and_release(0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_returns_nonzero() {
        let port = SocketBinder::new().bind_ephemeral().await.unwrap();
        assert_ne!(port, 0);
    }

    #[tokio::test]
    async fn test_bind_detects_occupied_port() {
        let holder = TcpListener::bind(SocketBinder::any_addr(0)).unwrap();
        let port = holder.local_addr().unwrap().port();

        let err = SocketBinder::new().bind(port).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);

        drop(holder);
    }

    #[tokio::test]
    async fn test_bind_releases_port() {
        let binder = SocketBinder::new();
        let port = binder.bind_ephemeral().await.unwrap();

        binder.bind(port).await.unwrap();
        // Still bindable: the probe must not hold it
        let again = TcpListener::bind(SocketBinder::any_addr(port));
        assert!(again.is_ok());
    }
}
