//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use wrr_balancer::config::{BalancerConfig, NodeConfig};
use wrr_balancer::{HttpServer, Shutdown};

/// A backend answering every request with a fixed body. Dropping or stopping it
/// closes the listener, so connects are refused afterwards.
pub struct MockBackend {
    pub addr: SocketAddr,
    body: &'static str,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start(body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self {
            addr,
            body,
            task: serve(listener, body),
        }
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    /// Listen again on the same port.
    pub async fn restart(&mut self) {
        self.task.abort();
        // Give the aborted task a chance to drop its listener.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let listener = TcpListener::bind(self.addr).await.unwrap();
        self.task = serve(listener, self.body);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn serve(listener: TcpListener, body: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    })
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config with the given nodes, health checks off and a 1ms retry delay.
pub fn config_for(nodes: &[(SocketAddr, u32)]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.nodes = nodes
        .iter()
        .map(|(addr, weight)| NodeConfig::new(addr.to_string(), *weight))
        .collect();
    config.health_check.enabled = false;
    config.retries.retry_delay_ms = 1;
    config.upstream.connect_timeout_ms = 200;
    config.upstream.request_timeout_ms = 1000;
    config
}

/// Start the balancer on an ephemeral port and return its address.
pub async fn start_balancer(config: &BalancerConfig, shutdown: &Shutdown) -> SocketAddr {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
