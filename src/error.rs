//! Error types shared across the balancer.
//!
//! Node-level failures ([`ForwardError`], probe failures) never reach a client:
//! the dispatcher turns them into retry, failover or mark-dead decisions. The only
//! user-visible error is [`DispatchError::ServiceUnavailable`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while building the node registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The address is not a `host:port` endpoint.
    #[error("invalid node address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("node '{address}' has weight 0, weights must be >= 1")]
    ZeroWeight { address: String },
}

/// The scheduler could not find a live node.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    #[error("no live node available")]
    NoneAvailable,
}

/// The health check timing is unusable: a probe could outlive its tick.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("health check timeout ({timeout:?}) must be less than the refresh rate ({refresh_rate:?})")]
pub struct HealthTimingError {
    pub timeout: std::time::Duration,
    pub refresh_rate: std::time::Duration,
}

/// Fatal problems while assembling the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    HealthTiming(#[from] HealthTimingError),

    #[error("no nodes configured")]
    NoNodes,
}

/// A transient failure relaying a request to one node.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream request: {0}")]
    Request(String),

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Why the dispatcher gave up on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The request already failed over on `max_attempts` nodes.
    AttemptsExhausted,
    /// Every node is dead.
    NoneAvailable,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::AttemptsExhausted => write!(f, "max attempts reached"),
            UnavailableReason::NoneAvailable => write!(f, "no live node"),
        }
    }
}

/// Terminal outcome of a dispatch.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("service unavailable: {reason}")]
    ServiceUnavailable { reason: UnavailableReason },
}

impl From<SelectError> for DispatchError {
    fn from(_: SelectError) -> Self {
        DispatchError::ServiceUnavailable {
            reason: UnavailableReason::NoneAvailable,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match self {
            DispatchError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "The service is unavailable.").into_response()
            }
        }
    }
}
