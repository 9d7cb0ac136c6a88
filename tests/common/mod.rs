//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use rr_proxy::config::ProxyConfig;
use rr_proxy::{BackendPool, HttpServer, Shutdown};

/// Reserve a local address nothing listens on.
pub async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Read one HTTP/1.1 request as text: the head plus either a Content-Length
/// body or a chunked body with its trailer section.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let chunked = head.lines().any(|line| line == "transfer-encoding: chunked");
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while !body_complete(&buf[end + 4..], chunked, length) {
                let n = socket.read(&mut chunk).await.ok()?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return Some(String::from_utf8_lossy(&buf).into_owned());
        }
    }
}

fn body_complete(body: &[u8], chunked: bool, length: usize) -> bool {
    if !chunked {
        return body.len() >= length;
    }
    // last chunk, optional trailer fields, then an empty line
    let text = String::from_utf8_lossy(body);
    (text.starts_with("0\r\n") || text.contains("\r\n0\r\n")) && text.ends_with("\r\n\r\n")
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Backend: mock\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend that answers every request with `status` and `body`.
pub async fn start_backend_at(addr: SocketAddr, status: &'static str, body: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_some() {
                    respond(&mut socket, status, body).await;
                }
            });
        }
    });
}

/// Start a backend that answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    let addr = free_addr().await;
    start_backend_at(addr, "200 OK", body).await;
    addr
}

/// Start a backend that echoes the raw request it received.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    respond(&mut socket, "200 OK", &request).await;
                }
            });
        }
    });
    addr
}

/// Start a backend that drops its first `failures` connections without
/// answering, then serves `body`. Returns the address and accepted count.
pub async fn start_flaky_backend(failures: u32, body: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            if counter.fetch_add(1, Ordering::SeqCst) < failures {
                drop(socket);
                continue;
            }
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_some() {
                    respond(&mut socket, "200 OK", body).await;
                }
            });
        }
    });
    (addr, accepted)
}

/// Config with fast timings and background probing off.
pub fn test_config(backends: Vec<String>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.backends = backends;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.health_check.enabled = false;
    config.observability.metrics_enabled = false;
    config.timeouts.connect_secs = 1;
    config.timeouts.request_secs = 10;
    config
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub pool: Arc<BackendPool>,
    pub shutdown: Shutdown,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let server = HttpServer::new(config).unwrap();
    let pool = server.pool();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningProxy { addr, pool, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
