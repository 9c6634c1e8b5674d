//! Reusable-port socket factory
//!
//! Drives a raw socket through
//! resolve -> create -> configure -> bind -> listen (stream only) -> adapt.
//! Each step either hands the socket to the next one or fails; on failure the
//! socket is dropped, and therefore closed, before the error is returned.

use std::io;
use std::net::SocketAddr;

use socket2::{Socket, Type};

use crate::adapter::{Adapt, DatagramAdapt, StreamAdapt};
use crate::error::{ReuseportError, Result, Step};
use crate::handle::{Connection, Listener};
use crate::logger;
use crate::platform::{PlatformOptions, SystemOptions};
use crate::protocol::{Protocol, Transport};
use crate::resolver::{resolve_protocol, ResolvedEndpoint};

/// Creates sockets with `SO_REUSEADDR` and port sharing enabled
#[derive(Debug, Clone, Default)]
pub struct ReusePortFactory<P = SystemOptions> {
    platform: P,
}

impl ReusePortFactory {
    pub const fn new() -> Self {
        Self {
            platform: SystemOptions,
        }
    }
}

impl<P: PlatformOptions> ReusePortFactory<P> {
    /// Use custom platform options instead of the running system's
    pub const fn with_platform(platform: P) -> Self {
        Self { platform }
    }

    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Create a listening stream socket on `address`.
    ///
    /// `protocol` must be `tcp`, `tcp4` or `tcp6`. Other listeners created
    /// the same way (in this or another process) can bind the same address.
    pub fn create_listener<L: StreamAdapt>(
        &self,
        protocol: &str,
        address: &str,
    ) -> Result<Listener<L>> {
        let protocol = parse_for(protocol, Transport::Stream)?;
        let (inner, local_addr) = self.build::<L>(protocol, address)?;
        Ok(Listener::new(inner, local_addr, protocol))
    }

    /// Create a bound datagram socket on `address`.
    ///
    /// `protocol` must be `udp`, `udp4` or `udp6`.
    pub fn create_connection<C: DatagramAdapt>(
        &self,
        protocol: &str,
        address: &str,
    ) -> Result<Connection<C>> {
        let protocol = parse_for(protocol, Transport::Datagram)?;
        let (inner, local_addr) = self.build::<C>(protocol, address)?;
        Ok(Connection::new(inner, local_addr, protocol))
    }

    fn build<H: Adapt>(&self, protocol: Protocol, address: &str) -> Result<(H, SocketAddr)> {
        let endpoint = resolve_protocol(protocol, address)?;
        let target = endpoint.socket_addr();
        // Declared before the socket so it is dropped after it.
        let mut cleanup = Cleanup::new(target);

        let socket = open_socket(&endpoint, protocol.transport)?;
        cleanup.enter(Step::Configure);

        socket
            .set_reuse_address(true)
            .map_err(|source| ReuseportError::SocketOption {
                option: "SO_REUSEADDR",
                source,
            })?;
        self.platform
            .enable_reuse_port(&socket)
            .map_err(|source| ReuseportError::SocketOption {
                option: self.platform.reuse_port_option().name(),
                source,
            })?;

        cleanup.enter(Step::Bind);
        let bind_error = |source| ReuseportError::Bind {
            endpoint: target,
            source,
        };
        socket.bind(&endpoint.sock_addr()).map_err(bind_error)?;
        let local_addr = socket
            .local_addr()
            .map_err(bind_error)?
            .as_socket()
            .ok_or_else(|| {
                bind_error(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "bound address is not an IP socket address",
                ))
            })?;

        if protocol.transport == Transport::Stream {
            cleanup.enter(Step::Listen);
            let backlog = self.platform.max_listen_backlog();
            self.platform
                .start_listening(&socket, backlog)
                .map_err(|source| ReuseportError::Listen {
                    endpoint: local_addr,
                    backlog,
                    source,
                })?;
        }

        cleanup.enter(Step::Adapt);
        let adapted = H::adapt(socket).map_err(|source| ReuseportError::Adapt {
            target: H::TARGET,
            source,
        })?;
        cleanup.disarm();

        logger::log_socket_ready(protocol, &local_addr, H::TARGET);
        Ok((adapted, local_addr))
    }
}

/// Parse a token and check it names the transport of the entry point
fn parse_for(token: &str, transport: Transport) -> Result<Protocol> {
    let protocol: Protocol = token.parse()?;
    if protocol.transport != transport {
        return Err(ReuseportError::UnsupportedProtocol {
            token: token.to_string(),
            expected: match transport {
                Transport::Stream => "tcp, tcp4, tcp6",
                Transport::Datagram => "udp, udp4, udp6",
            },
        });
    }
    Ok(protocol)
}

fn open_socket(endpoint: &ResolvedEndpoint, transport: Transport) -> Result<Socket> {
    let (ty, proto) = match transport {
        Transport::Stream => (Type::STREAM, socket2::Protocol::TCP),
        Transport::Datagram => (Type::DGRAM, socket2::Protocol::UDP),
    };
    Socket::new(endpoint.domain(), ty, Some(proto)).map_err(|source| {
        ReuseportError::SocketCreation {
            family: endpoint.family(),
            transport,
            source,
        }
    })
}

/// Records which step holds the socket, and logs its release if `build`
/// returns early.
struct Cleanup {
    endpoint: SocketAddr,
    step: Option<Step>,
}

impl Cleanup {
    const fn new(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            step: None,
        }
    }

    fn enter(&mut self, step: Step) {
        self.step = Some(step);
    }

    fn disarm(&mut self) {
        self.step = None;
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some(step) = self.step {
            logger::log_descriptor_released(step, &self.endpoint);
        }
    }
}

/// Listening TCP socket that shares `address` with other listeners
pub fn listen(protocol: &str, address: &str) -> Result<Listener> {
    ReusePortFactory::new().create_listener(protocol, address)
}

/// Bound UDP socket that shares `address` with other sockets
pub fn listen_packet(protocol: &str, address: &str) -> Result<Connection> {
    ReusePortFactory::new().create_connection(protocol, address)
}

/// Like [`listen`], registered with the current tokio runtime
pub fn bind_listener(protocol: &str, address: &str) -> Result<Listener<tokio::net::TcpListener>> {
    ReusePortFactory::new().create_listener(protocol, address)
}

/// Like [`listen_packet`], registered with the current tokio runtime
pub fn bind_socket(protocol: &str, address: &str) -> Result<Connection<tokio::net::UdpSocket>> {
    ReusePortFactory::new().create_connection(protocol, address)
}
