//! Configuration validation.
//!
//! Serde handles syntax; this checks meaning. Every problem is reported, not
//! just the first, and nothing is accepted into the system before it passes.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::load_balancer::node::NodeAddress;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no nodes configured")]
    NoNodes,

    #[error("node #{index}: invalid address '{address}'")]
    InvalidAddress { index: usize, address: String },

    #[error("node #{index} ({address}): weight must be >= 1")]
    ZeroWeight { index: usize, address: String },

    #[error("health_check.refresh_rate_ms must be > 0")]
    ZeroRefreshRate,

    #[error("health_check.timeout_ms ({timeout_ms}) must be less than refresh_rate_ms ({refresh_rate_ms})")]
    TimeoutNotBelowRefreshRate { timeout_ms: u64, refresh_rate_ms: u64 },

    #[error("retries.max_attempts must be >= 1")]
    ZeroAttempts,

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.nodes.is_empty() {
        errors.push(ValidationError::NoNodes);
    }
    for (index, node) in config.nodes.iter().enumerate() {
        if NodeAddress::parse(&node.address).is_err() {
            errors.push(ValidationError::InvalidAddress {
                index,
                address: node.address.clone(),
            });
        }
        if node.weight == 0 {
            errors.push(ValidationError::ZeroWeight {
                index,
                address: node.address.clone(),
            });
        }
    }

    let health = &config.health_check;
    if health.refresh_rate_ms == 0 {
        errors.push(ValidationError::ZeroRefreshRate);
    } else if health.timeout_ms >= health.refresh_rate_ms {
        errors.push(ValidationError::TimeoutNotBelowRefreshRate {
            timeout_ms: health.timeout_ms,
            refresh_rate_ms: health.refresh_rate_ms,
        });
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
