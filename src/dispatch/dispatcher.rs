//! Request dispatcher: selection, forwarding, retry and failover.
//!
//! # State Machine
//! ```text
//! attempt_count >= max_attempts ─────────────────────────▶ ServiceUnavailable
//! select_node ── NoneAvailable ──────────────────────────▶ ServiceUnavailable
//!      │
//!      ▼
//! forward ── Ok ─────────────────────────────────────────▶ Response
//!      │
//!      Err
//!      ├── retry_count < max_retries: sleep, retry()  ──▶ forward (same node)
//!      └── otherwise: mark node dead, failover()      ──▶ attempt check
//! ```
//!
//! Dropping the future returned by [`RequestDispatcher::handle`] cancels the
//! in-flight forward and any pending retry delay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::response::Response;

use crate::config::RetryConfig;
use crate::dispatch::forwarder::ProxyRequest;
use crate::dispatch::state::RetryState;
use crate::error::{DispatchError, UnavailableReason};
use crate::load_balancer::registry::NodeRegistry;
use crate::load_balancer::Scheduler;
use crate::observability::metrics;

/// Per-request entry point into the balancer.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    registry: Arc<NodeRegistry>,
    scheduler: Arc<dyn Scheduler>,
    max_retries: u32,
    max_attempts: u32,
    retry_delay: Duration,
}

impl RequestDispatcher {
    pub fn new(
        registry: Arc<NodeRegistry>,
        scheduler: Arc<dyn Scheduler>,
        config: &RetryConfig,
    ) -> Self {
        Self {
            registry,
            scheduler,
            max_retries: config.max_retries,
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Dispatch `request` starting from `state` (normally `RetryState::default()`).
    pub async fn handle(
        &self,
        request: ProxyRequest,
        state: RetryState,
    ) -> Result<Response, DispatchError> {
        let start_time = Instant::now();
        let result = self.run(&request, state).await;
        let outcome = match &result {
            Ok(_) => "forwarded",
            Err(DispatchError::ServiceUnavailable { .. }) => "unavailable",
        };
        metrics::record_request(outcome, start_time);
        result
    }

    async fn run(
        &self,
        request: &ProxyRequest,
        mut state: RetryState,
    ) -> Result<Response, DispatchError> {
        let path = request.path_and_query();

        loop {
            if state.attempt_count >= self.max_attempts {
                tracing::warn!(
                    path = %path,
                    attempts = state.attempt_count,
                    "Max attempts reached, terminating"
                );
                return Err(DispatchError::ServiceUnavailable {
                    reason: UnavailableReason::AttemptsExhausted,
                });
            }

            let node = match self.scheduler.select_node(&self.registry) {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!(
                        path = %path,
                        scheduler = self.scheduler.name(),
                        alive = self.registry.alive_count(),
                        "No live node available"
                    );
                    return Err(e.into());
                }
            };

            loop {
                metrics::record_forward_attempt();
                match node.forwarder().forward(request.clone()).await {
                    Ok(response) => {
                        tracing::debug!(
                            addr = %node.address(),
                            path = %path,
                            status = %response.status(),
                            retry = state.retry_count,
                            attempt = state.attempt_count,
                            "Request forwarded"
                        );
                        return Ok(response);
                    }
                    Err(e) => {
                        tracing::debug!(
                            addr = %node.address(),
                            path = %path,
                            retry = state.retry_count,
                            attempt = state.attempt_count,
                            error = %e,
                            "Forward failed"
                        );
                    }
                }

                if state.retry_count < self.max_retries {
                    tokio::time::sleep(self.retry_delay).await;
                    state = state.retry();
                    continue;
                }

                tracing::warn!(
                    addr = %node.address(),
                    retries = state.retry_count,
                    "Retries exhausted, marking node dead"
                );
                self.registry.mark_status(node.address(), false);
                metrics::record_failover(&node.address().to_string());
                state = state.failover();
                tracing::info!(path = %path, attempt = state.attempt_count, "Re-dispatching request");
                break;
            }
        }
    }
}
