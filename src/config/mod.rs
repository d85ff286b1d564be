//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            node list file (address[,weight])
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → registry, dispatcher and health checker built from it once
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the node set is fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - A bad address or `timeout >= refresh_rate` is fatal at startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_node_list, ConfigError};
pub use schema::{
    BalancerConfig, HealthCheckConfig, ListenerConfig, LogFormat, NodeConfig,
    ObservabilityConfig, RetryConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
