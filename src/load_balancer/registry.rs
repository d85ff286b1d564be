//! Node registry.
//!
//! # Responsibilities
//! - Hold the ordered node list built at configuration time
//! - Own the shared rotation cursor
//! - Route liveness updates to the matching node

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::NodeConfig;
use crate::dispatch::forwarder::Forwarder;
use crate::error::RegistryError;
use crate::load_balancer::node::{Node, NodeAddress};

/// Ordered collection of backend nodes.
///
/// Nodes are appended during setup and never removed; only their liveness
/// changes while serving. Each node carries its own lock, there is no
/// registry-wide lock.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Arc<Node>>,
    cursor: AtomicUsize,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured nodes, asking `make_forwarder` for each
    /// node's forwarder.
    pub fn from_nodes<F>(nodes: &[NodeConfig], make_forwarder: F) -> Result<Self, RegistryError>
    where
        F: Fn(&NodeAddress) -> Arc<dyn Forwarder>,
    {
        let mut registry = Self::new();
        for node in nodes {
            let address = NodeAddress::parse(&node.address)?;
            registry.add(&node.address, node.weight, make_forwarder(&address))?;
        }
        Ok(registry)
    }

    /// Parse `address`, append an alive node and return a handle to it.
    pub fn add(
        &mut self,
        address: &str,
        weight: u32,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Arc<Node>, RegistryError> {
        let address = NodeAddress::parse(address)?;
        if weight == 0 {
            return Err(RegistryError::ZeroWeight {
                address: address.to_string(),
            });
        }
        let node = Arc::new(Node::new(address, weight, forwarder));
        tracing::debug!(addr = %node.address(), weight, "Node registered");
        self.nodes.push(node.clone());
        Ok(node)
    }

    /// Set liveness of the node at `address`. Unknown addresses are ignored.
    pub fn mark_status(&self, address: &NodeAddress, alive: bool) {
        let Some(node) = self.nodes.iter().find(|n| n.address() == address) else {
            tracing::debug!(addr = %address, "mark_status on unknown node ignored");
            return;
        };
        let was_alive = node.set_alive(alive);
        if was_alive != alive {
            tracing::info!(
                addr = %address,
                alive,
                "Node liveness changed"
            );
        }
        crate::observability::metrics::record_node_liveness(&address.to_string(), alive);
    }

    /// `(index, weight)` for every node, in registry order.
    pub fn snapshot_weights(&self) -> Vec<(usize, u32)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.weight()))
            .collect()
    }

    /// Node at `index % len`.
    ///
    /// # Panics
    /// On an empty registry. Serving never starts with one.
    pub fn node_at(&self, index: usize) -> &Arc<Node> {
        &self.nodes[index % self.nodes.len()]
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_alive()).count()
    }

    /// Claim the next rotation slot. Returns the slot before the increment.
    pub(crate) fn advance_cursor(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed)
    }

    /// Record where the last selection landed so the next claim starts after it.
    pub(crate) fn persist_cursor(&self, index: usize) {
        self.cursor.store(index.wrapping_add(1), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::forwarder::testing::StaticForwarder;

    fn fwd() -> Arc<dyn Forwarder> {
        Arc::new(StaticForwarder::ok("ok"))
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut registry = NodeRegistry::new();
        registry.add("127.0.0.1:8080", 1, fwd()).unwrap();
        registry.add("127.0.0.1:8081", 3, fwd()).unwrap();

        assert_eq!(registry.snapshot_weights(), vec![(0, 1), (1, 3)]);
        assert_eq!(registry.node_at(3).address().port(), 8081);
        assert!(registry.node_at(0).is_alive());
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let mut registry = NodeRegistry::new();
        assert!(matches!(
            registry.add("not an address", 1, fwd()),
            Err(RegistryError::InvalidAddress { .. })
        ));
        assert!(matches!(
            registry.add("127.0.0.1:8080", 0, fwd()),
            Err(RegistryError::ZeroWeight { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mark_status() {
        let mut registry = NodeRegistry::new();
        let node = registry.add("127.0.0.1:8080", 1, fwd()).unwrap();
        registry.add("127.0.0.1:8081", 1, fwd()).unwrap();

        registry.mark_status(node.address(), false);
        assert!(!node.is_alive());
        assert_eq!(registry.alive_count(), 1);

        registry.mark_status(node.address(), true);
        assert!(node.is_alive());
    }

    #[test]
    fn test_from_nodes() {
        let nodes = vec![
            NodeConfig::new("http://localhost:4311", 1),
            NodeConfig::new("localhost:1232", 2),
        ];
        let registry = NodeRegistry::from_nodes(&nodes, |_| fwd()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.node_at(0).address().to_string(), "localhost:4311");

        let bad = vec![NodeConfig::new("localhost", 1)];
        assert!(NodeRegistry::from_nodes(&bad, |_| fwd()).is_err());
    }

    #[test]
    fn test_mark_status_unknown_address_is_noop() {
        let mut registry = NodeRegistry::new();
        registry.add("127.0.0.1:8080", 1, fwd()).unwrap();

        let unknown = NodeAddress::parse("10.9.9.9:1").unwrap();
        registry.mark_status(&unknown, false);
        assert_eq!(registry.alive_count(), 1);
    }
}
