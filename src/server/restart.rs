// Hot restart module
// Drains sockets that were replaced by a freshly bound set on the same port

use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};

use super::connection::accept_connection;
use super::datagram::echo;
use reuseport::{logger, Connection, Listener};

/// How long a replaced socket keeps serving what is already queued on it
pub const DRAIN_PERIOD: Duration = Duration::from_millis(100);

/// Drain old listener's backlog queue for 100ms then close it.
///
/// Connections the kernel queued on this listener before the new set was
/// bound are still accepted; new connections already go to the new set.
/// Active connections finish in their own tasks.
pub async fn drain_old_listener(id: usize, mut listener: Listener<TcpListener>) {
    logger::log_info(&format!("[listener {id}] Draining backlog for 100ms..."));

    let drain_deadline = tokio::time::Instant::now() + DRAIN_PERIOD;
    let mut accepted = 0usize;

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accepted += 1;
                        accept_connection(id, stream, &peer_addr);
                    }
                    Err(e) => {
                        logger::log_error(&format!("[listener {id}] Accept error while draining: {e}"));
                        break;
                    }
                }
            }

            () = tokio::time::sleep_until(drain_deadline) => break,
        }
    }

    listener.close();
    logger::log_info(&format!(
        "[listener {id}] ✓ Closed after draining {accepted} connections"
    ));
}

/// Keep echoing on a replaced datagram socket for 100ms, then close it.
pub async fn drain_old_socket(
    id: usize,
    mut socket: Connection<UdpSocket>,
    mut buf: Vec<u8>,
) {
    let drain_deadline = tokio::time::Instant::now() + DRAIN_PERIOD;

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, peer_addr)) => echo(id, &socket, &buf[..len], &peer_addr).await,
                    Err(e) => {
                        logger::log_error(&format!("[listener {id}] Receive error while draining: {e}"));
                        break;
                    }
                }
            }

            () = tokio::time::sleep_until(drain_deadline) => break,
        }
    }

    socket.close();
    logger::log_info(&format!("[listener {id}] ✓ Closed after draining"));
}
