//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup lives in main: config, logging, routes, then listener
//! - Shutdown has a grace period: forced exit after the deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
