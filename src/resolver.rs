//! Address resolution
//!
//! Turns a protocol token and a "host:port" string into a [`ResolvedEndpoint`]
//! whose address bytes always match its family.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

use socket2::{Domain, SockAddr};

use crate::error::{ReuseportError, Result};
use crate::protocol::{Family, Protocol};

/// Raw address bytes, tagged with their family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointAddr {
    V4([u8; 4]),
    V6([u8; 16]),
}

/// A concrete (family, address bytes, port) triple ready for binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedEndpoint {
    addr: EndpointAddr,
    port: u16,
}

impl ResolvedEndpoint {
    pub const fn new(addr: EndpointAddr, port: u16) -> Self {
        Self { addr, port }
    }

    pub const fn family(&self) -> Family {
        match self.addr {
            EndpointAddr::V4(_) => Family::V4,
            EndpointAddr::V6(_) => Family::V6,
        }
    }

    pub const fn addr(&self) -> EndpointAddr {
        self.addr
    }

    /// 4 bytes for IPv4, 16 bytes for IPv6
    pub fn octets(&self) -> &[u8] {
        match &self.addr {
            EndpointAddr::V4(bytes) => bytes,
            EndpointAddr::V6(bytes) => bytes,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn ip(&self) -> IpAddr {
        match self.addr {
            EndpointAddr::V4(bytes) => IpAddr::V4(Ipv4Addr::from(bytes)),
            EndpointAddr::V6(bytes) => IpAddr::V6(Ipv6Addr::from(bytes)),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip(), self.port)
    }

    pub(crate) const fn domain(&self) -> Domain {
        match self.addr {
            EndpointAddr::V4(_) => Domain::IPV4,
            EndpointAddr::V6(_) => Domain::IPV6,
        }
    }

    pub(crate) fn sock_addr(&self) -> SockAddr {
        SockAddr::from(self.socket_addr())
    }
}

/// Resolve `address` for the protocol named by `token`.
///
/// Unknown tokens fail with [`ReuseportError::UnsupportedProtocol`]; every
/// address problem fails with [`ReuseportError::Resolution`].
pub fn resolve(token: &str, address: &str) -> Result<ResolvedEndpoint> {
    let protocol: Protocol = token.parse()?;
    resolve_protocol(protocol, address)
}

/// Resolve `address` for an already parsed protocol.
///
/// Explicit families (`tcp4`, `udp6`, ...) only accept addresses expressible
/// in that family. Generic tokens take the first IPv4-representable candidate
/// if there is one, otherwise the first IPv6 candidate, and classify the
/// chosen address by its narrowest exact representation.
pub fn resolve_protocol(protocol: Protocol, address: &str) -> Result<ResolvedEndpoint> {
    let fail = |reason: String| ReuseportError::resolution(protocol, address, reason);

    let (host, port) = split_host_port(address).map_err(fail)?;
    if host.contains('%') {
        return Err(fail(format!("zone identifier in {host} is not supported")));
    }

    if host.is_empty() {
        let addr = match protocol.family {
            Some(Family::V6) => EndpointAddr::V6(Ipv6Addr::UNSPECIFIED.octets()),
            Some(Family::V4) | None => EndpointAddr::V4(Ipv4Addr::UNSPECIFIED.octets()),
        };
        return Ok(ResolvedEndpoint::new(addr, port));
    }

    let (candidates, literal) = match host.parse::<IpAddr>() {
        Ok(ip) => (vec![ip], true),
        Err(_) => (lookup_host(host, port).map_err(fail)?, false),
    };

    let selected = match protocol.family {
        Some(Family::V4) => candidates.iter().find_map(ipv4_octets).map(EndpointAddr::V4),
        Some(Family::V6) => candidates.iter().find_map(ipv6_octets).map(EndpointAddr::V6),
        None => candidates
            .iter()
            .find_map(ipv4_octets)
            .map(EndpointAddr::V4)
            .or_else(|| candidates.iter().find_map(ipv6_octets).map(EndpointAddr::V6)),
    };

    match selected {
        Some(addr) => Ok(ResolvedEndpoint::new(addr, port)),
        None => {
            let family = protocol.family.unwrap_or(Family::V4);
            let reason = if literal {
                format!("{host} is not an {family} address")
            } else {
                format!("host {host} has no {family} address")
            };
            Err(fail(reason))
        }
    }
}

/// IPv4 addresses and IPv4-mapped IPv6 addresses collapse to 4 bytes.
fn ipv4_octets(ip: &IpAddr) -> Option<[u8; 4]> {
    match ip {
        IpAddr::V4(v4) => Some(v4.octets()),
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(|v4| v4.octets()),
    }
}

fn ipv6_octets(ip: &IpAddr) -> Option<[u8; 16]> {
    match ip {
        IpAddr::V4(_) => None,
        IpAddr::V6(v6) => Some(v6.octets()),
    }
}

fn lookup_host(host: &str, port: u16) -> Result<Vec<IpAddr>, String> {
    let candidates: Vec<IpAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("lookup {host}: {e}"))?
        .map(|addr| addr.ip())
        .collect();

    if candidates.is_empty() {
        return Err(format!("lookup {host}: no addresses found"));
    }
    Ok(candidates)
}

/// Split "host:port", "[v6-host]:port" or ":port".
///
/// An empty port means port 0.
fn split_host_port(address: &str) -> Result<(&str, u16), String> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or("missing ']' in address")?;
        let port = tail.strip_prefix(':').ok_or("missing port in address")?;
        (host, port)
    } else {
        let (host, port) = address.rsplit_once(':').ok_or("missing port in address")?;
        if host.contains(':') {
            return Err("too many colons in address".to_string());
        }
        if host.contains(['[', ']']) || port.contains(['[', ']']) {
            return Err("unexpected bracket in address".to_string());
        }
        (host, port)
    };

    if port.is_empty() {
        return Ok((host, 0));
    }
    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid port {port:?}"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("invalid port {port:?}"))?;
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKENS: [&str; 6] = ["tcp", "tcp4", "tcp6", "udp", "udp4", "udp6"];

    #[test]
    fn test_explicit_ipv4() {
        for token in ["tcp4", "udp4"] {
            let endpoint = resolve(token, "127.0.0.1:9000").unwrap();
            assert_eq!(endpoint.family(), Family::V4);
            assert_eq!(endpoint.octets(), &[127, 0, 0, 1]);
            assert_eq!(endpoint.port(), 9000);
        }
    }

    #[test]
    fn test_explicit_ipv6() {
        for token in ["tcp6", "udp6"] {
            let endpoint = resolve(token, "[::1]:9000").unwrap();
            assert_eq!(endpoint.family(), Family::V6);
            assert_eq!(endpoint.octets(), &Ipv6Addr::LOCALHOST.octets());
            assert_eq!(endpoint.octets().len(), 16);
        }
    }

    #[test]
    fn test_generic_follows_literal() {
        for token in ["tcp", "udp"] {
            let v4 = resolve(token, "10.1.2.3:80").unwrap();
            assert_eq!(v4.family(), Family::V4);
            assert_eq!(v4.octets(), &[10, 1, 2, 3]);

            let v6 = resolve(token, "[2001:db8::1]:80").unwrap();
            assert_eq!(v6.family(), Family::V6);
            assert_eq!(v6.ip(), "2001:db8::1".parse::<IpAddr>().unwrap());
        }
    }

    #[test]
    fn test_explicit_family_mismatch() {
        for (token, address) in [
            ("tcp4", "[::1]:9000"),
            ("udp4", "[2001:db8::1]:53"),
            ("tcp6", "127.0.0.1:9000"),
            ("udp6", "10.0.0.1:53"),
        ] {
            let err = resolve(token, address).unwrap_err();
            assert!(
                matches!(err, ReuseportError::Resolution { .. }),
                "{token} {address}: {err}"
            );
        }
    }

    #[test]
    fn test_ipv4_mapped_literal() {
        let generic = resolve("tcp", "[::ffff:192.0.2.7]:80").unwrap();
        assert_eq!(generic.family(), Family::V4);
        assert_eq!(generic.octets(), &[192, 0, 2, 7]);

        let v4 = resolve("udp4", "[::ffff:192.0.2.7]:80").unwrap();
        assert_eq!(v4.addr(), EndpointAddr::V4([192, 0, 2, 7]));

        let v6 = resolve("tcp6", "[::ffff:192.0.2.7]:80").unwrap();
        assert_eq!(v6.family(), Family::V6);
        assert_eq!(v6.octets().len(), 16);
    }

    #[test]
    fn test_empty_host_is_wildcard() {
        let endpoint = resolve("tcp4", ":10081").unwrap();
        assert_eq!(endpoint.socket_addr(), "0.0.0.0:10081".parse().unwrap());

        let endpoint = resolve("tcp6", ":10081").unwrap();
        assert_eq!(endpoint.socket_addr(), "[::]:10081".parse().unwrap());

        let endpoint = resolve("udp", ":10081").unwrap();
        assert_eq!(endpoint.family(), Family::V4);
        assert_eq!(endpoint.octets(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_port_is_zero() {
        let endpoint = resolve("tcp4", "127.0.0.1:").unwrap();
        assert_eq!(endpoint.port(), 0);

        let endpoint = resolve("udp6", "[::1]:").unwrap();
        assert_eq!(endpoint.port(), 0);
    }

    #[test]
    fn test_localhost_under_ipv4() {
        let endpoint = resolve("tcp4", "localhost:10081").unwrap();
        assert_eq!(endpoint.octets(), &[127, 0, 0, 1]);
        assert_eq!(endpoint.port(), 10081);
    }

    #[test]
    fn test_malformed_addresses() {
        let malformed = [
            "not-an-address",
            "127.0.0.1",
            "::1:80",
            "[::1:80",
            "[::1]80",
            "127.0.0.1:99999",
            "127.0.0.1:http",
            "127.0.0.1:-1",
            "127.0.0.1:+80",
            "[fe80::1%lo]:80",
            "fe80%eth0:80",
            "a]b:80",
            "",
        ];
        for token in TOKENS {
            for address in malformed {
                let err = resolve(token, address).unwrap_err();
                assert!(
                    matches!(err, ReuseportError::Resolution { .. }),
                    "{token} {address:?}: {err}"
                );
            }
        }
    }

    #[test]
    fn test_unresolvable_host() {
        for token in TOKENS {
            let err = resolve(token, "no-such-host.invalid:80").unwrap_err();
            assert!(matches!(err, ReuseportError::Resolution { .. }), "{err}");
        }
    }

    #[test]
    fn test_unknown_protocol() {
        let err = resolve("sctp", "127.0.0.1:80").unwrap_err();
        assert!(matches!(err, ReuseportError::UnsupportedProtocol { .. }));
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com:443").unwrap(), ("example.com", 443));
        assert_eq!(split_host_port("[fe80::1]:22").unwrap(), ("fe80::1", 22));
        assert_eq!(split_host_port(":8080").unwrap(), ("", 8080));
        assert_eq!(split_host_port("[::]:").unwrap(), ("::", 0));
        assert!(split_host_port("127.0.0.1:+80").is_err());
        assert!(split_host_port("127.0.0.1: 80").is_err());
    }
}
