// 连接处理模块
// 处理单个 TCP 连接的接受和服务

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use super::{restart, Stop};
use reuseport::{logger, Listener};

/// Upper bound on the lifetime of one HTTP connection
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Accept connections on one shared listener until told to stop.
pub async fn accept_loop(
    id: usize,
    listener: Listener<TcpListener>,
    mut stop: watch::Receiver<Stop>,
) {
    let state = loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(id, stream, &peer_addr),
                    Err(e) => logger::log_error(&format!(
                        "[listener {id}] Failed to accept connection: {e}"
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
        restart::drain_old_listener(id, listener).await;
    }
}

/// Log the connection and serve it in its own task.
pub fn accept_connection(id: usize, stream: TcpStream, peer_addr: &SocketAddr) {
    logger::log_connection_accepted(id, peer_addr);
    handle_connection(id, stream);
}

/// Handle a single connection in a spawned task.
///
/// Every request is answered with the listener number and process id, which
/// shows which of the sockets sharing the port the kernel picked.
fn handle_connection(id: usize, stream: TcpStream) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let conn = http1::Builder::new().serve_connection(
            io,
            service_fn(move |_req| async move {
                let body = format!("listener {id} (pid {})\n", std::process::id());
                Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(body))))
            }),
        );

        match tokio::time::timeout(CONNECTION_TIMEOUT, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "[listener {id}] Connection timeout after {} seconds",
                CONNECTION_TIMEOUT.as_secs()
            )),
        }
    });
}
