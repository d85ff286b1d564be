//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every node
//! - Write the result back through the registry (the only revival path)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::error::HealthTimingError;
use crate::health::probe::Prober;
use crate::load_balancer::registry::NodeRegistry;

pub struct HealthChecker {
    registry: Arc<NodeRegistry>,
    prober: Arc<dyn Prober>,
    refresh_rate: Duration,
    timeout: Duration,
}

impl HealthChecker {
    /// Fails when `timeout >= refresh_rate`.
    pub fn new(
        registry: Arc<NodeRegistry>,
        prober: Arc<dyn Prober>,
        refresh_rate: Duration,
        timeout: Duration,
    ) -> Result<Self, HealthTimingError> {
        if timeout >= refresh_rate {
            return Err(HealthTimingError {
                timeout,
                refresh_rate,
            });
        }
        Ok(Self {
            registry,
            prober,
            refresh_rate,
            timeout,
        })
    }

    pub fn from_config(
        registry: Arc<NodeRegistry>,
        prober: Arc<dyn Prober>,
        config: &HealthCheckConfig,
    ) -> Result<Self, HealthTimingError> {
        Self::new(
            registry,
            prober,
            Duration::from_millis(config.refresh_rate_ms),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Run the check loop on its own task.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Probe every `refresh_rate` until shutdown. The first round runs one
    /// full interval after start; nodes begin alive.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            refresh_rate = ?self.refresh_rate,
            timeout = ?self.timeout,
            nodes = self.registry.len(),
            "Health checker starting"
        );

        let mut ticker = time::interval_at(
            time::Instant::now() + self.refresh_rate,
            self.refresh_rate,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe each node once, in registry order.
    pub async fn check_all(&self) {
        for node in self.registry.nodes() {
            let alive = self.prober.probe(node.address(), self.timeout).await;
            self.registry.mark_status(node.address(), alive);
            tracing::debug!(
                addr = %node.address(),
                status = if alive { "alive" } else { "down" },
                "Node probed"
            );
        }
    }
}
