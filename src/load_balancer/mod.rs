//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher needs a node
//!     → scheduler.rs (weighted round robin over the registry)
//!     → registry.rs (weights snapshot, shared cursor, per-node liveness)
//!     → node.rs (liveness read under the node's own read lock)
//!     → Return a live node or NoneAvailable
//! ```
//!
//! # Design Decisions
//! - Registry is built once at startup; nodes are never added or removed while serving
//! - Liveness is locked per node, never per registry
//! - The rotation cursor is a lock-free atomic shared by all requests
//! - Dead nodes are skipped, not removed

pub mod node;
pub mod registry;
pub mod scheduler;

use std::sync::Arc;

use crate::error::SelectError;
use node::Node;
use registry::NodeRegistry;

/// A node selection strategy.
pub trait Scheduler: Send + Sync + std::fmt::Debug {
    /// Pick a live node, or `NoneAvailable` when there is none.
    fn select_node(&self, registry: &NodeRegistry) -> Result<Arc<Node>, SelectError>;

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}
