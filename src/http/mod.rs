//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum fallback, body collection, blocking pool)
//!     → app.rs (route lookup, context checkout)
//!     → context.rs (middleware → handler via next())
//!     → errors.rs (404 / 405 / 500 pages)
//!     → buffered response back to Axum
//! ```

pub mod app;
pub mod context;
pub mod errors;
pub mod handler;
pub mod middleware;
pub mod pool;
pub mod server;

pub use app::App;
pub use context::{Context, DispatchState};
pub use errors::ErrorPages;
pub use handler::{Handler, HandlerChain};
pub use pool::ContextPool;
pub use server::HttpServer;
