//! Node reachability probes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;

use crate::load_balancer::node::NodeAddress;

/// Checks whether a node is reachable within `timeout`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &NodeAddress, timeout: Duration) -> bool;
}

/// Probe by opening a TCP connection to the node.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &NodeAddress, timeout: Duration) -> bool {
        let connect = TcpStream::connect(address.to_string());
        match time::timeout(timeout, connect).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::warn!(addr = %address, error = %e, "Node unreachable");
                false
            }
            Err(_) => {
                tracing::warn!(addr = %address, timeout = ?timeout, "Node probe timed out");
                false
            }
        }
    }
}
