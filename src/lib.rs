//! Sockets that share one address and port.
//!
//! Every listener or datagram socket created here has `SO_REUSEADDR` and the
//! platform's port-sharing option enabled before it is bound, so any number
//! of processes (or sockets in one process) can bind the same `host:port`
//! and let the kernel spread connections or datagrams across them.
//!
//! ```no_run
//! let first = reuseport::listen("tcp", "127.0.0.1:8881")?;
//! let second = reuseport::listen("tcp", "127.0.0.1:8881")?;
//! assert_eq!(first.local_addr(), second.local_addr());
//! # Ok::<(), reuseport::ReuseportError>(())
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
pub mod logger;
pub mod platform;
pub mod protocol;
pub mod resolver;

pub use adapter::{Adapt, DatagramAdapt, StreamAdapt};
pub use error::{ReuseportError, Result, Step};
pub use factory::{bind_listener, bind_socket, listen, listen_packet, ReusePortFactory};
pub use handle::{Connection, Listener};
pub use platform::{max_listen_backlog, PlatformOptions, ReusePortOption, SystemOptions};
pub use protocol::{Family, Protocol, Transport};
pub use resolver::{resolve, resolve_protocol, EndpointAddr, ResolvedEndpoint};
