//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! App::dispatch / middleware produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (plain or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line emitted for a request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
