// Server loop module
// Owns the current socket set and swaps it on SIGHUP without closing the port

use std::net::SocketAddr;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::signal::SignalHandler;
use super::{connection, datagram, Stop};
use reuseport::config::Config;
use reuseport::{Connection, Listener, Protocol, ReuseportError};

/// Tasks serving one socket set, and the switch that stops them
struct Generation {
    stop: watch::Sender<Stop>,
    tasks: Vec<JoinHandle<()>>,
}

impl Generation {
    /// Spawn one task per socket; `next_id` numbers sockets across sets
    fn spawn<T, F>(sockets: Vec<T>, next_id: &mut usize, serve: F) -> Self
    where
        F: Fn(usize, T, watch::Receiver<Stop>) -> JoinHandle<()>,
    {
        let (stop, _) = watch::channel(Stop::Running);
        let tasks = sockets
            .into_iter()
            .map(|socket| {
                *next_id += 1;
                serve(*next_id, socket, stop.subscribe())
            })
            .collect();
        Self { stop, tasks }
    }

    fn drain(self) {
        self.stop.send_replace(Stop::Drain);
    }

    async fn shutdown(self) {
        self.stop.send_replace(Stop::Shutdown);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind `count` sockets on one address.
///
/// The first socket is bound to `address` as configured; the others reuse its
/// actual local address so that port 0 still yields one shared port.
fn bind_set<T>(
    address: &str,
    count: usize,
    bind: impl Fn(&str) -> Result<T, ReuseportError>,
    local_addr: impl Fn(&T) -> SocketAddr,
) -> Result<(Vec<T>, SocketAddr), ReuseportError> {
    let first = bind(address)?;
    let shared = local_addr(&first);
    let shared_str = shared.to_string();

    let mut sockets = Vec::with_capacity(count);
    sockets.push(first);
    for _ in 1..count {
        sockets.push(bind(&shared_str)?);
    }
    Ok((sockets, shared))
}

/// Serve socket sets until shutdown, rebinding on every reload signal
async fn run_generations<T, B, F>(
    protocol: Protocol,
    cfg: &Config,
    signals: &SignalHandler,
    bind: B,
    local_addr: fn(&T) -> SocketAddr,
    serve: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    B: Fn(&str) -> Result<T, ReuseportError>,
    F: Fn(usize, T, watch::Receiver<Stop>) -> JoinHandle<()> + Copy,
{
    let count = cfg.server.listeners.max(1);
    let (sockets, shared) = bind_set(&cfg.server.address, count, &bind, local_addr)?;
    reuseport::logger::log_server_start(protocol, &shared, count);

    let mut next_id = 0;
    let mut generation = Generation::spawn(sockets, &mut next_id, serve);

    loop {
        tokio::select! {
            () = signals.reload.notified() => {
                reuseport::logger::log_rebind_triggered(&shared);
                match bind_set(&shared.to_string(), count, &bind, local_addr) {
                    Ok((fresh, _)) => {
                        let old = std::mem::replace(
                            &mut generation,
                            Generation::spawn(fresh, &mut next_id, serve),
                        );
                        old.drain();
                        reuseport::logger::log_info(&format!(
                            "[Rebind] ✓ New sockets serving {shared}, old sockets draining"
                        ));
                    }
                    Err(e) => reuseport::logger::log_rebind_failed(&e),
                }
            }

            () = signals.shutdown.notified() => {
                reuseport::logger::log_info("[Shutdown] Closing sockets");
                generation.shutdown().await;
                reuseport::logger::log_info("[Shutdown] ✓ All sockets closed");
                return Ok(());
            }
        }
    }
}

pub async fn run_stream(
    cfg: &Config,
    protocol: Protocol,
    signals: &SignalHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    run_generations(
        protocol,
        cfg,
        signals,
        |address| reuseport::bind_listener(protocol.as_str(), address),
        Listener::local_addr,
        |id, listener, stop| tokio::spawn(connection::accept_loop(id, listener, stop)),
    )
    .await
}

pub async fn run_datagram(
    cfg: &Config,
    protocol: Protocol,
    signals: &SignalHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    run_generations(
        protocol,
        cfg,
        signals,
        |address| reuseport::bind_socket(protocol.as_str(), address),
        Connection::local_addr,
        |id, socket, stop| tokio::spawn(datagram::echo_loop(id, socket, stop)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_set_shares_ephemeral_port() {
        let (listeners, shared) = bind_set(
            "127.0.0.1:0",
            3,
            |addr| reuseport::listen("tcp4", addr),
            |listener: &Listener| listener.local_addr(),
        )
        .unwrap();

        assert_eq!(listeners.len(), 3);
        assert_ne!(shared.port(), 0);
        for listener in &listeners {
            assert_eq!(listener.local_addr(), shared);
        }
    }

    #[test]
    fn test_rebind_lands_on_same_port() {
        let (old_set, shared) = bind_set(
            "127.0.0.1:0",
            2,
            |addr| reuseport::listen_packet("udp4", addr),
            |conn: &Connection| conn.local_addr(),
        )
        .unwrap();

        // New set binds while the old one is still open, as on reload
        let (new_set, rebound) = bind_set(
            &shared.to_string(),
            2,
            |addr| reuseport::listen_packet("udp4", addr),
            |conn: &Connection| conn.local_addr(),
        )
        .unwrap();

        assert_eq!(rebound, shared);
        assert_eq!(old_set.len() + new_set.len(), 4);
    }

    #[test]
    fn test_bind_set_stops_at_first_failure() {
        let result = bind_set(
            "127.0.0.1:http",
            2,
            |addr| reuseport::listen("tcp4", addr),
            |listener: &Listener| listener.local_addr(),
        );
        assert!(matches!(result, Err(ReuseportError::Resolution { .. })));
    }
}
