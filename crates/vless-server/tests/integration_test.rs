//! Integration tests for vless-server.
//!
//! These run the real listener and drive it with a WebSocket client:
//! - handshake, acceptance and echo relay
//! - authentication failure
//! - status and share pages
//! - path mismatch rejection
//! - concurrent session isolation
//! - graceful drain of live sessions
#![allow(clippy::tests_outside_test_module)]

use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use vless_config::Config;
use vless_proto::{AddressRef, CMD_TCP, HostRef, write_request_header};
use vless_server::{CancellationToken, serve};

const UUID: &str = "90cd2451-9316-43f1-b1e1-123456789abc";
const ID: [u8; 16] = [
    0x90, 0xcd, 0x24, 0x51, 0x93, 0x16, 0x43, 0xf1, 0xb1, 0xe1, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc,
];
const WAIT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Test Helpers
// ============================================================================

/// A TCP server that echoes back whatever it receives.
async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut r, mut w) = socket.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
            });
        }
    });
    addr
}

/// A TCP server that greets every connection with `greeting` and closes.
async fn start_greeting_server(greeting: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(greeting).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.auth.uuid = Some(UUID.into());
        config.server.handshake_timeout_secs = 2;
        config.server.connect_timeout_secs = 2;
        configure(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            serve(listener, config, token).await.unwrap();
        });
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    async fn connect(&self, path: &str) -> Client {
        let (ws, _) = connect_async(format!("ws://{}{}", self.addr, path))
            .await
            .unwrap();
        ws
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(WAIT, self.handle).await.unwrap().unwrap();
    }
}

fn handshake(id: &[u8; 16], target: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let SocketAddr::V4(v4) = target else {
        panic!("test targets are IPv4");
    };
    let addr = AddressRef {
        host: HostRef::Ipv4(v4.ip().octets()),
        port: v4.port(),
    };
    let mut buf = BytesMut::new();
    write_request_header(&mut buf, id, &[], CMD_TCP, &addr).unwrap();
    buf.extend_from_slice(payload);
    buf.to_vec()
}

/// Next binary message, skipping control frames. `None` once the session ends.
async fn next_binary(ws: &mut Client) -> Option<Vec<u8>> {
    loop {
        match tokio::time::timeout(WAIT, ws.next()).await.unwrap() {
            Some(Ok(Message::Binary(data))) => return Some(data),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

/// Collect binary data until `len` bytes have arrived.
async fn read_binary(ws: &mut Client, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    while out.len() < len {
        let chunk = next_binary(ws).await.expect("session ended early");
        out.extend_from_slice(&chunk);
    }
    out
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: relay.example.com\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    response
}

// ============================================================================
// Relay
// ============================================================================

#[tokio::test]
async fn websocket_session_relays_to_echo_server() {
    let echo = start_echo_server().await;
    let server = TestServer::start().await;
    let mut ws = server.connect("/").await;

    ws.send(Message::Binary(handshake(&ID, echo, b"hello")))
        .await
        .unwrap();

    assert_eq!(next_binary(&mut ws).await.unwrap(), vec![0x00, 0x00]);
    assert_eq!(read_binary(&mut ws, 5).await, b"hello");

    ws.send(Message::Binary(b"second frame".to_vec())).await.unwrap();
    assert_eq!(read_binary(&mut ws, 12).await, b"second frame");

    ws.close(None).await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn destination_close_ends_session() {
    let greeter = start_greeting_server(b"welcome").await;
    let server = TestServer::start().await;
    let mut ws = server.connect("/").await;

    ws.send(Message::Binary(handshake(&ID, greeter, &[])))
        .await
        .unwrap();

    assert_eq!(next_binary(&mut ws).await.unwrap(), vec![0x00, 0x00]);
    assert_eq!(read_binary(&mut ws, 7).await, b"welcome");
    assert!(next_binary(&mut ws).await.is_none());
    server.stop().await;
}

#[tokio::test]
async fn wrong_identifier_gets_no_acceptance() {
    let echo = start_echo_server().await;
    let server = TestServer::start().await;
    let mut ws = server.connect("/").await;

    ws.send(Message::Binary(handshake(&[0u8; 16], echo, b"hello")))
        .await
        .unwrap();

    assert!(next_binary(&mut ws).await.is_none());
    server.stop().await;
}

#[tokio::test]
async fn truncated_handshake_closes_channel() {
    let server = TestServer::start().await;
    let mut ws = server.connect("/").await;

    ws.send(Message::Binary(vec![0x00, 0x01, 0x02])).await.unwrap();

    assert!(next_binary(&mut ws).await.is_none());
    server.stop().await;
}

#[tokio::test]
async fn concurrent_sessions_are_isolated() {
    let alpha = start_greeting_server(b"alpha").await;
    let beta = start_greeting_server(b"beta").await;
    let server = TestServer::start().await;

    let mut first = server.connect("/").await;
    let mut second = server.connect("/").await;
    first
        .send(Message::Binary(handshake(&ID, alpha, &[])))
        .await
        .unwrap();
    second
        .send(Message::Binary(handshake(&ID, beta, &[])))
        .await
        .unwrap();

    assert_eq!(next_binary(&mut first).await.unwrap(), vec![0, 0]);
    assert_eq!(next_binary(&mut second).await.unwrap(), vec![0, 0]);
    assert_eq!(read_binary(&mut second, 4).await, b"beta");
    assert_eq!(read_binary(&mut first, 5).await, b"alpha");
    assert!(next_binary(&mut first).await.is_none());
    assert!(next_binary(&mut second).await.is_none());
    server.stop().await;
}

#[tokio::test]
async fn shutdown_waits_for_live_session() {
    let echo = start_echo_server().await;
    let server = TestServer::start().await;
    let mut ws = server.connect("/").await;

    ws.send(Message::Binary(handshake(&ID, echo, b"ping")))
        .await
        .unwrap();
    assert_eq!(next_binary(&mut ws).await.unwrap(), vec![0x00, 0x00]);
    assert_eq!(read_binary(&mut ws, 4).await, b"ping");

    let TestServer {
        shutdown, handle, ..
    } = server;
    shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!handle.is_finished());

    ws.close(None).await.unwrap();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

// ============================================================================
// HTTP surface
// ============================================================================

#[tokio::test]
async fn plain_request_gets_status_page() {
    let server = TestServer::start().await;
    let response = http_get(server.addr, "/").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("System Running..."));
    server.stop().await;
}

#[tokio::test]
async fn credential_path_gets_share_link() {
    let server = TestServer::start_with(|config| {
        config.websocket.path = "/ws".into();
    })
    .await;
    let response = http_get(server.addr, &format!("/{UUID}")).await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains(&format!(
        "vless://{UUID}@relay.example.com:443?encryption=none&security=tls&type=ws&host=relay.example.com&path=%2Fws#relay.example.com"
    )));
    server.stop().await;
}

#[tokio::test]
async fn upgrade_on_wrong_path_is_rejected() {
    let server = TestServer::start_with(|config| {
        config.websocket.path = "/tunnel".into();
    })
    .await;
    let result = connect_async(format!("ws://{}/elsewhere", server.addr)).await;
    assert!(result.is_err());

    let mut ws = server.connect("/tunnel").await;
    ws.close(None).await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn non_http_bytes_are_dropped() {
    let server = TestServer::start().await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(&[0x16, 0x03, 0x01, 0x02, 0x00]).await.unwrap();
    let mut buf = Vec::new();
    let n = tokio::time::timeout(WAIT, stream.read_to_end(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
    server.stop().await;
}

#[tokio::test]
async fn connection_limit_drops_excess() {
    let server = TestServer::start_with(|config| {
        config.server.max_connections = Some(1);
    })
    .await;
    let held = server.connect("/").await;

    let mut extra = TcpStream::connect(server.addr).await.unwrap();
    let mut buf = Vec::new();
    let n = tokio::time::timeout(WAIT, extra.read_to_end(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);

    drop(held);
    server.stop().await;
}
