//! Weighted round-robin HTTP load balancer library.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use dispatch::{RequestDispatcher, RetryState};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{registry::NodeRegistry, scheduler::WeightedRoundRobin, Scheduler};
