//! Descriptor adapters
//!
//! An adapter takes ownership of a configured raw socket and turns it into a
//! listener or datagram socket type. It either returns a fully usable object
//! or fails, in which case the socket it was handed has already been closed.

use std::io;

use socket2::Socket;

/// Conversion from a bound raw socket into a caller-visible type
pub trait Adapt: Sized {
    /// Name used in errors and logs
    const TARGET: &'static str;

    fn adapt(socket: Socket) -> io::Result<Self>;
}

/// Adapters for listening stream sockets
pub trait StreamAdapt: Adapt {}

/// Adapters for bound datagram sockets
pub trait DatagramAdapt: Adapt {}

impl Adapt for std::net::TcpListener {
    const TARGET: &'static str = "std::net::TcpListener";

    fn adapt(socket: Socket) -> io::Result<Self> {
        Ok(socket.into())
    }
}

impl StreamAdapt for std::net::TcpListener {}

impl Adapt for std::net::UdpSocket {
    const TARGET: &'static str = "std::net::UdpSocket";

    fn adapt(socket: Socket) -> io::Result<Self> {
        Ok(socket.into())
    }
}

impl DatagramAdapt for std::net::UdpSocket {}

impl Adapt for tokio::net::TcpListener {
    const TARGET: &'static str = "tokio::net::TcpListener";

    fn adapt(socket: Socket) -> io::Result<Self> {
        let listener: std::net::TcpListener = into_nonblocking(socket)?.into();
        Self::from_std(listener)
    }
}

impl StreamAdapt for tokio::net::TcpListener {}

impl Adapt for tokio::net::UdpSocket {
    const TARGET: &'static str = "tokio::net::UdpSocket";

    fn adapt(socket: Socket) -> io::Result<Self> {
        let socket: std::net::UdpSocket = into_nonblocking(socket)?.into();
        Self::from_std(socket)
    }
}

impl DatagramAdapt for tokio::net::UdpSocket {}

/// Prepare a socket for registration with the current tokio runtime.
///
/// Registering outside a runtime panics inside tokio, so that case is turned
/// into an error here.
fn into_nonblocking(socket: Socket) -> io::Result<Socket> {
    tokio::runtime::Handle::try_current().map_err(io::Error::other)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}
