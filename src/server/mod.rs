// Demo server module entry point
// Binds a set of sockets on one shared address and serves them until shutdown

pub mod connection;
pub mod datagram;
pub mod restart;
pub mod signal;

// Rust 不允许 loop 作为模块名（关键字），改用 server_loop
#[path = "loop.rs"]
pub mod server_loop;

use std::sync::Arc;

use reuseport::config::Config;
use reuseport::Transport;

use signal::SignalHandler;

/// State broadcast to every task serving one socket set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Running,
    /// Replaced by a newer set: serve the backlog briefly, then close
    Drain,
    Shutdown,
}

/// Run the demo server described by `cfg` until SIGINT/SIGTERM
pub async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let protocol = cfg.protocol()?;

    let signals = Arc::new(SignalHandler::new());
    signal::start_signal_handler(Arc::clone(&signals));

    match protocol.transport {
        Transport::Stream => server_loop::run_stream(&cfg, protocol, &signals).await,
        Transport::Datagram => server_loop::run_datagram(&cfg, protocol, &signals).await,
    }
}
