//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active checks (active.rs):
//!     Periodic timer (refresh rate)
//!     → probe.rs (TCP connect bounded by timeout)
//!     → registry.mark_status(alive)
//!
//! Failover (dispatch):
//!     Retries exhausted on a node
//!     → registry.mark_status(false)
//! ```
//!
//! # Design Decisions
//! - Probing is the only path that revives a dead node
//! - One probe round runs sequentially; requests never wait on it
//! - A failed probe is logged, never fatal

pub mod active;
pub mod probe;

pub use active::HealthChecker;
pub use probe::{Prober, TcpProber};
