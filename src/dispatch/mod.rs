//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (buffered into ProxyRequest)
//!     → dispatcher.rs (attempt budget, node selection)
//!     → forwarder.rs (node's forwarder relays the request)
//!     → On failure: state.rs (retry in place, or failover to another node)
//!     → Response or ServiceUnavailable
//! ```
//!
//! # Design Decisions
//! - Retry/attempt counters are plain values passed forward, never stored centrally
//! - Retries against one node and re-routes across nodes have separate budgets
//! - Forward errors never reach the client; only budget exhaustion does

pub mod dispatcher;
pub mod forwarder;
pub mod state;

pub use dispatcher::RequestDispatcher;
pub use forwarder::{Forwarder, ProxyRequest};
pub use state::RetryState;
