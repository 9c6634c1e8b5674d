//! Protocol tokens
//!
//! Parses the six tokens accepted by the factory (`tcp`, `tcp4`, `tcp6`,
//! `udp`, `udp4`, `udp6`) into a transport kind and an optional explicit
//! address family.

use std::fmt;
use std::str::FromStr;

use crate::error::ReuseportError;

/// Transport kind selected by the protocol token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Connection-oriented (TCP)
    Stream,
    /// Connectionless (UDP)
    Datagram,
}

impl Transport {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "tcp",
            Self::Datagram => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("IPv4"),
            Self::V6 => f.write_str("IPv6"),
        }
    }
}

/// A parsed protocol token
///
/// `family` is `None` for the generic tokens (`tcp`, `udp`), in which case the
/// family is taken from the resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol {
    pub transport: Transport,
    pub family: Option<Family>,
}

impl Protocol {
    pub const TCP: Self = Self::new(Transport::Stream, None);
    pub const TCP4: Self = Self::new(Transport::Stream, Some(Family::V4));
    pub const TCP6: Self = Self::new(Transport::Stream, Some(Family::V6));
    pub const UDP: Self = Self::new(Transport::Datagram, None);
    pub const UDP4: Self = Self::new(Transport::Datagram, Some(Family::V4));
    pub const UDP6: Self = Self::new(Transport::Datagram, Some(Family::V6));

    pub const fn new(transport: Transport, family: Option<Family>) -> Self {
        Self { transport, family }
    }

    /// Whether the token fixes the address family
    pub const fn is_explicit(self) -> bool {
        self.family.is_some()
    }

    /// The token this protocol was parsed from
    pub const fn as_str(self) -> &'static str {
        match (self.transport, self.family) {
            (Transport::Stream, None) => "tcp",
            (Transport::Stream, Some(Family::V4)) => "tcp4",
            (Transport::Stream, Some(Family::V6)) => "tcp6",
            (Transport::Datagram, None) => "udp",
            (Transport::Datagram, Some(Family::V4)) => "udp4",
            (Transport::Datagram, Some(Family::V6)) => "udp6",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ReuseportError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "tcp" => Ok(Self::TCP),
            "tcp4" => Ok(Self::TCP4),
            "tcp6" => Ok(Self::TCP6),
            "udp" => Ok(Self::UDP),
            "udp4" => Ok(Self::UDP4),
            "udp6" => Ok(Self::UDP6),
            other => Err(ReuseportError::UnsupportedProtocol {
                token: other.to_string(),
                expected: "tcp, tcp4, tcp6, udp, udp4, udp6",
            }),
        }
    }
}
