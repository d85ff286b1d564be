//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build registry → Spawn health checker → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → health checker exits, listener stops accepting
//! ```
//!
//! In-flight requests are not drained.

pub mod shutdown;

pub use shutdown::Shutdown;
