// Datagram echo module
// Echoes every datagram back to its sender, tagged with the socket number

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use super::{restart, Stop};
use reuseport::{logger, Connection};

/// Largest datagram the echo loop reads
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Echo datagrams on one shared socket until told to stop.
pub async fn echo_loop(
    id: usize,
    socket: Connection<UdpSocket>,
    mut stop: watch::Receiver<Stop>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    let state = loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, peer_addr)) => echo(id, &socket, &buf[..len], &peer_addr).await,
                    Err(e) => logger::log_error(&format!(
                        "[listener {id}] Failed to receive datagram: {e}"
                    )),
                }
            }

            changed = stop.changed() => {
                let state = if changed.is_ok() { *stop.borrow() } else { Stop::Shutdown };
                if state != Stop::Running {
                    break state;
                }
            }
        }
    };

    if state == Stop::Drain {
        restart::drain_old_socket(id, socket, buf).await;
    }
}

/// Send `payload` back to `peer_addr` prefixed with `listener <id>: `.
pub async fn echo(
    id: usize,
    socket: &Connection<UdpSocket>,
    payload: &[u8],
    peer_addr: &SocketAddr,
) {
    logger::log_datagram(id, peer_addr, payload.len());

    let mut reply = format!("listener {id}: ").into_bytes();
    reply.extend_from_slice(payload);
    if let Err(e) = socket.send_to(&reply, *peer_addr).await {
        logger::log_error(&format!(
            "[listener {id}] Failed to reply to {peer_addr}: {e}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::timeout;

    #[tokio::test]
    async fn test_echo_prefixes_listener_id() {
        let socket = reuseport::bind_socket("udp4", "127.0.0.1:0").unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client.local_addr().unwrap();

        echo(7, &socket, b"ping", &client_addr).await;

        let mut buf = [0u8; 64];
        let (len, from) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"listener 7: ping");
        assert_eq!(from, socket.local_addr());
    }

    #[tokio::test]
    async fn test_echo_loop_stops_on_shutdown() {
        let socket = reuseport::bind_socket("udp4", "127.0.0.1:0").unwrap();
        let server_addr = socket.local_addr();
        let (stop, stop_rx) = watch::channel(Stop::Running);
        let task = tokio::spawn(echo_loop(3, socket, stop_rx));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"hello", server_addr).await.unwrap();
        let mut buf = [0u8; 64];
        let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"listener 3: hello");

        stop.send_replace(Stop::Shutdown);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
