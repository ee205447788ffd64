//! Embeddable HTTP request router.
//!
//! Routes are registered on a [`Router`], compiled into a prefix tree and
//! frozen into an [`App`] that is shared read-only across workers. Each
//! request runs a synchronous chain of [`Handler`]s over a pooled
//! [`Context`].
//!
//! ```
//! use waymark::{Handler, Router, StatusCode};
//!
//! # fn main() -> Result<(), waymark::RouteError> {
//! let mut router = Router::new();
//! router
//!     .layer(waymark::middleware::recovery())?
//!     .get("/users/:id", Handler::named("show_user", |ctx| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.text(StatusCode::OK, id);
//!     }))?;
//! let app = router.build();
//! assert_eq!(app.routes().len(), 1);
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use axum::http::{Method, StatusCode};

pub use config::ServerConfig;
pub use http::middleware;
pub use http::{App, Context, ErrorPages, Handler, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Group, Params, RouteError, Router};
