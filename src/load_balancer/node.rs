//! Backend node abstraction.
//!
//! # Responsibilities
//! - Represent a single backend endpoint and its weight
//! - Own the node's forwarder
//! - Guard the liveness flag with a per-node reader/writer lock

use std::fmt;
use std::sync::{Arc, RwLock};
use url::Url;

use crate::dispatch::forwarder::Forwarder;
use crate::error::RegistryError;

/// A validated `host:port` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    host: String,
    port: u16,
}

impl NodeAddress {
    /// Parse `host:port`. An `http://` or `https://` prefix and a trailing `/` are
    /// tolerated so node lists written as URLs keep working.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidAddress {
            address: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let authority = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        if authority.is_empty() {
            return Err(invalid("empty address"));
        }
        if authority.contains('/') || authority.contains('@') {
            return Err(invalid("expected host:port"));
        }

        let url = Url::parse(&format!("http://{}", authority))
            .map_err(|e| invalid(&e.to_string()))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        // Url drops the port when it equals the scheme default, so look at the raw text.
        let port = match url.port() {
            Some(p) => p,
            None if authority.ends_with(":80") => 80,
            None => return Err(invalid("missing port")),
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A single backend node.
pub struct Node {
    address: NodeAddress,
    weight: u32,
    alive: RwLock<bool>,
    forwarder: Arc<dyn Forwarder>,
}

impl Node {
    /// Create a new node. Nodes start alive.
    pub fn new(address: NodeAddress, weight: u32, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            address,
            weight,
            alive: RwLock::new(true),
            forwarder,
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn forwarder(&self) -> &Arc<dyn Forwarder> {
        &self.forwarder
    }

    /// Read the liveness flag.
    pub fn is_alive(&self) -> bool {
        // A poisoned lock still holds a valid bool.
        match self.alive.read() {
            Ok(alive) => *alive,
            Err(poisoned) => **poisoned.get_ref(),
        }
    }

    /// Set the liveness flag and return the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        let mut guard = match self.alive.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, alive)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.address)
            .field("weight", &self.weight)
            .field("alive", &self.is_alive())
            .finish()
    }
}
