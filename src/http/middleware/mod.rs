//! Built-in middleware.
//!
//! Every middleware is a plain [`Handler`](crate::http::Handler) that calls
//! `ctx.next()` to continue, or writes a response and returns to stop the
//! chain. Attach them with `Router::layer`, `Group::layer` or per route via
//! `Router::insert`.
//!
//! # Ordering
//! ```text
//! recovery → rate_limit → cors → basic_auth → timeout → handler
//! ```
//! `recovery` belongs first so its access line and panic guard cover the
//! rest. The order of the others is up to the application.

pub mod basic_auth;
pub mod cors;
pub mod https;
pub mod rate_limit;
pub mod recovery;
pub mod timeout;

pub use basic_auth::basic_auth;
pub use cors::cors;
pub use https::https_redirect;
pub use rate_limit::{rate_limit, RateLimiter};
pub use recovery::recovery;
pub use timeout::timeout;
