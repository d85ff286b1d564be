//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, buffer body into ProxyRequest)
//!     → dispatch (select node, retry, failover)
//!     → forwarder.rs (hyper client to the chosen node)
//!     → backend response, or 503 once budgets run out
//! ```

pub mod forwarder;
pub mod server;

pub use forwarder::HttpForwarder;
pub use server::HttpServer;
