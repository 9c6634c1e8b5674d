//! Two HTTP servers on one port: both answer while both run, and the
//! survivor answers everything once the other is closed.

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::TokioIo;
use reuseport::Listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const SERVER_ONE_RESPONSE: &str = "1";
const SERVER_TWO_RESPONSE: &str = "2";

fn start_server(listener: Listener<TcpListener>, response: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let service = service_fn(move |_req| async move {
                    Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(response))))
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    })
}

async fn get(addr: SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_servers_share_port() {
    let listener_one = reuseport::bind_listener("tcp4", "127.0.0.1:0").unwrap();
    let addr = listener_one.local_addr();
    let listener_two = reuseport::bind_listener("tcp", &addr.to_string()).unwrap();
    assert_eq!(listener_two.local_addr(), addr);

    let server_one = start_server(listener_one, SERVER_ONE_RESPONSE);
    let server_two = start_server(listener_two, SERVER_TWO_RESPONSE);

    for _ in 0..4 {
        let body = get(addr).await;
        assert!(
            body == SERVER_ONE_RESPONSE || body == SERVER_TWO_RESPONSE,
            "unexpected body {body:?}"
        );
    }

    // Dropping the accept task drops and closes its listener.
    server_two.abort();
    let _ = server_two.await;

    for _ in 0..4 {
        assert_eq!(get(addr).await, SERVER_ONE_RESPONSE);
    }

    server_one.abort();
}
