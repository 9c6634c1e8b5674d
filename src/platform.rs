//! Platform socket options
//!
//! The only OS-specific pieces of socket construction: which option turns on
//! port sharing, and how deep a listen backlog the kernel accepts.

use std::io;
use std::sync::OnceLock;

use socket2::Socket;

use crate::logger;

/// Backlog used when the kernel limit cannot be read
pub const DEFAULT_BACKLOG: i32 = 128;

#[cfg(target_os = "linux")]
const SOMAXCONN_PATH: &str = "/proc/sys/net/core/somaxconn";

static MAX_BACKLOG: OnceLock<i32> = OnceLock::new();

/// Socket option that enables port sharing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReusePortOption {
    /// `SO_REUSEPORT`
    ReusePort,
    /// `SO_REUSEPORT_LB` (FreeBSD load-balancing variant)
    ReusePortLb,
    /// No port-sharing option on this platform
    Unsupported,
}

impl ReusePortOption {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReusePort => "SO_REUSEPORT",
            Self::ReusePortLb => "SO_REUSEPORT_LB",
            Self::Unsupported => "SO_REUSEPORT (unsupported)",
        }
    }

    /// The option for the target this crate was compiled for
    pub const fn native() -> Self {
        if cfg!(target_os = "freebsd") {
            Self::ReusePortLb
        } else if cfg!(all(
            unix,
            not(any(target_os = "solaris", target_os = "illumos", target_os = "cygwin"))
        )) {
            Self::ReusePort
        } else {
            Self::Unsupported
        }
    }
}

/// Capability interface for platform-dependent socket settings
pub trait PlatformOptions {
    fn reuse_port_option(&self) -> ReusePortOption;

    fn max_listen_backlog(&self) -> i32;

    fn enable_reuse_port(&self, socket: &Socket) -> io::Result<()> {
        apply_reuse_port(socket, self.reuse_port_option())
    }

    /// Put a bound stream socket into the listening state
    fn start_listening(&self, socket: &Socket, backlog: i32) -> io::Result<()> {
        socket.listen(backlog)
    }
}

/// Settings of the running operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOptions;

impl PlatformOptions for SystemOptions {
    fn reuse_port_option(&self) -> ReusePortOption {
        ReusePortOption::native()
    }

    fn max_listen_backlog(&self) -> i32 {
        max_listen_backlog()
    }
}

impl<P: PlatformOptions + ?Sized> PlatformOptions for &P {
    fn reuse_port_option(&self) -> ReusePortOption {
        (**self).reuse_port_option()
    }

    fn max_listen_backlog(&self) -> i32 {
        (**self).max_listen_backlog()
    }

    fn enable_reuse_port(&self, socket: &Socket) -> io::Result<()> {
        (**self).enable_reuse_port(socket)
    }

    fn start_listening(&self, socket: &Socket, backlog: i32) -> io::Result<()> {
        (**self).start_listening(socket, backlog)
    }
}

/// Largest listen backlog the kernel accepts, read once per process
pub fn max_listen_backlog() -> i32 {
    *MAX_BACKLOG.get_or_init(|| {
        let backlog = read_max_backlog();
        logger::log_backlog_detected(backlog);
        backlog
    })
}

#[cfg(target_os = "linux")]
fn read_max_backlog() -> i32 {
    std::fs::read_to_string(SOMAXCONN_PATH)
        .map_or(DEFAULT_BACKLOG, |contents| parse_backlog(&contents))
}

#[cfg(not(target_os = "linux"))]
const fn read_max_backlog() -> i32 {
    DEFAULT_BACKLOG
}

/// Parse the contents of a somaxconn sysctl.
///
/// Zero or garbage falls back to [`DEFAULT_BACKLOG`]; oversized values are
/// clamped to what `listen(2)` can take.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_backlog(contents: &str) -> i32 {
    match contents.trim().parse::<u64>() {
        Ok(0) | Err(_) => DEFAULT_BACKLOG,
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
    }
}

#[cfg(target_os = "freebsd")]
fn apply_reuse_port(socket: &Socket, option: ReusePortOption) -> io::Result<()> {
    match option {
        ReusePortOption::ReusePortLb => socket.set_reuse_port_lb(true),
        ReusePortOption::ReusePort => socket.set_reuse_port(true),
        ReusePortOption::Unsupported => Err(unsupported()),
    }
}

#[cfg(all(
    unix,
    not(any(
        target_os = "freebsd",
        target_os = "solaris",
        target_os = "illumos",
        target_os = "cygwin"
    ))
))]
fn apply_reuse_port(socket: &Socket, option: ReusePortOption) -> io::Result<()> {
    match option {
        ReusePortOption::ReusePort => socket.set_reuse_port(true),
        ReusePortOption::ReusePortLb | ReusePortOption::Unsupported => Err(unsupported()),
    }
}

#[cfg(not(all(
    unix,
    not(any(target_os = "solaris", target_os = "illumos", target_os = "cygwin"))
)))]
fn apply_reuse_port(_socket: &Socket, _option: ReusePortOption) -> io::Result<()> {
    Err(unsupported())
}

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "port sharing is not supported on this platform",
    )
}
