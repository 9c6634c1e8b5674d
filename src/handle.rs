//! Listener and connection handles
//!
//! Handles own the adapted socket. `close` releases it early and may be
//! called any number of times; operations after close fail with
//! `NotConnected`.

use std::io;
use std::net::SocketAddr;

use crate::protocol::Protocol;

fn closed(kind: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{kind} is closed"))
}

/// A listening stream socket that shares its address with other listeners
#[derive(Debug)]
pub struct Listener<L = std::net::TcpListener> {
    inner: Option<L>,
    local_addr: SocketAddr,
    protocol: Protocol,
}

impl<L> Listener<L> {
    pub(crate) const fn new(inner: L, local_addr: SocketAddr, protocol: Protocol) -> Self {
        Self {
            inner: Some(inner),
            local_addr,
            protocol,
        }
    }

    /// Address the socket was bound to, with the OS-assigned port filled in
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub const fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Close the listener. Returns `true` if this call closed it.
    pub fn close(&mut self) -> bool {
        self.inner.take().is_some()
    }

    pub fn get_ref(&self) -> io::Result<&L> {
        self.inner.as_ref().ok_or_else(|| closed("listener"))
    }

    /// Take the adapted listener out of the handle
    pub fn into_inner(self) -> Option<L> {
        self.inner
    }
}

impl Listener<std::net::TcpListener> {
    /// Block until a connection arrives on this socket
    pub fn accept(&self) -> io::Result<(std::net::TcpStream, SocketAddr)> {
        self.get_ref()?.accept()
    }
}

impl Listener<tokio::net::TcpListener> {
    pub async fn accept(&self) -> io::Result<(tokio::net::TcpStream, SocketAddr)> {
        self.get_ref()?.accept().await
    }
}

/// A bound datagram socket that shares its address with other sockets
#[derive(Debug)]
pub struct Connection<C = std::net::UdpSocket> {
    inner: Option<C>,
    local_addr: SocketAddr,
    protocol: Protocol,
}

impl<C> Connection<C> {
    pub(crate) const fn new(inner: C, local_addr: SocketAddr, protocol: Protocol) -> Self {
        Self {
            inner: Some(inner),
            local_addr,
            protocol,
        }
    }

    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub const fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Close the socket. Returns `true` if this call closed it.
    pub fn close(&mut self) -> bool {
        self.inner.take().is_some()
    }

    pub fn get_ref(&self) -> io::Result<&C> {
        self.inner.as_ref().ok_or_else(|| closed("connection"))
    }

    pub fn into_inner(self) -> Option<C> {
        self.inner
    }
}

impl Connection<std::net::UdpSocket> {
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.get_ref()?.send_to(buf, target)
    }

    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.get_ref()?.recv_from(buf)
    }
}

impl Connection<tokio::net::UdpSocket> {
    pub async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.get_ref()?.send_to(buf, target).await
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.get_ref()?.recv_from(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_is_idempotent() {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let local = socket.local_addr().unwrap();
        let mut conn = Connection::new(socket, local, Protocol::UDP4);

        assert!(!conn.is_closed());
        assert!(conn.close());
        assert!(conn.is_closed());
        assert!(!conn.close());
        assert!(!conn.close());

        let err = conn.send_to(b"x", local).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(conn.into_inner().is_none());
    }

    #[test]
    fn test_closed_listener_rejects_accept() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let local = listener.local_addr().unwrap();
        let mut listener = Listener::new(listener, local, Protocol::TCP4);

        assert_eq!(listener.local_addr(), local);
        assert_eq!(listener.protocol(), Protocol::TCP4);
        assert!(listener.close());
        assert_eq!(
            listener.accept().unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }
}
