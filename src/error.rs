//! Error types
//!
//! Every failure names the step of socket construction it came from. Any
//! descriptor acquired before that step has already been released when one
//! of these values reaches the caller.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::{Family, Protocol, Transport};

/// Step of socket construction at which an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Resolve,
    Create,
    Configure,
    Bind,
    Listen,
    Adapt,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Create => "create",
            Self::Configure => "configure",
            Self::Bind => "bind",
            Self::Listen => "listen",
            Self::Adapt => "adapt",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ReuseportError {
    /// The protocol token is unknown or names the wrong transport.
    #[error("unsupported protocol {token:?}: only {expected} are supported")]
    UnsupportedProtocol { token: String, expected: &'static str },

    /// The address is malformed, unresolvable, or not expressible in the
    /// family the protocol token requires.
    #[error("cannot resolve {address:?} for {protocol}: {reason}")]
    Resolution {
        protocol: Protocol,
        address: String,
        reason: String,
    },

    #[error("failed to create {family} {transport} socket: {source}")]
    SocketCreation {
        family: Family,
        transport: Transport,
        #[source]
        source: io::Error,
    },

    #[error("failed to enable {option}: {source}")]
    SocketOption {
        option: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen on {endpoint} (backlog {backlog}): {source}")]
    Listen {
        endpoint: SocketAddr,
        backlog: i32,
        #[source]
        source: io::Error,
    },

    #[error("failed to adapt socket into {target}: {source}")]
    Adapt {
        target: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ReuseportError {
    /// The construction step that failed
    pub const fn step(&self) -> Step {
        match self {
            Self::UnsupportedProtocol { .. } | Self::Resolution { .. } => Step::Resolve,
            Self::SocketCreation { .. } => Step::Create,
            Self::SocketOption { .. } => Step::Configure,
            Self::Bind { .. } => Step::Bind,
            Self::Listen { .. } => Step::Listen,
            Self::Adapt { .. } => Step::Adapt,
        }
    }

    pub(crate) fn resolution(protocol: Protocol, address: &str, reason: impl fmt::Display) -> Self {
        Self::Resolution {
            protocol,
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ReuseportError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_attribution() {
        let err = ReuseportError::resolution(Protocol::TCP4, "[::1]:80", "not an IPv4 address");
        assert_eq!(err.step(), Step::Resolve);

        let err = ReuseportError::SocketOption {
            option: "SO_REUSEPORT",
            source: io::Error::from(io::ErrorKind::Unsupported),
        };
        assert_eq!(err.step(), Step::Configure);
        assert!(err.to_string().contains("SO_REUSEPORT"));
    }

    #[test]
    fn test_display_names_address() {
        let err = ReuseportError::resolution(Protocol::UDP6, "127.0.0.1:53", "not an IPv6 address");
        let message = err.to_string();
        assert!(message.contains("127.0.0.1:53"));
        assert!(message.contains("udp6"));
    }
}
