//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     Router / Group calls (get, post, layer, ...)
//!     → tree.rs insert (one node per path segment)
//!     → rule.rs compiles each new segment
//!     → cached middleware + handler chains per (node, method)
//!     → Router::build freezes everything into an immutable App
//!
//! Incoming Request (method, path)
//!     → tree.rs find (literal → pattern → named → wildcard)
//!     → Return: handler chain + captured Params (or a 404/405 chain)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - Malformed rules fail registration; unmatched requests never error

use thiserror::Error;

use crate::routing::rule::RuleError;

/// Generates the per-method registration shortcuts shared by
/// [`Router`](router::Router) and [`Group`](group::Group).
macro_rules! method_shortcuts {
    ($($name:ident => $method:literal;)+) => {
        $(
            #[doc = concat!("Register a handler for `", $method, "` requests.")]
            pub fn $name(
                &mut self,
                path: &str,
                handler: $crate::http::Handler,
            ) -> Result<&mut Self, $crate::routing::RouteError> {
                self.handle($method, path, handler)
            }
        )+
    };
}

pub mod group;
pub mod node;
pub mod params;
pub mod router;
pub mod rule;
pub mod tree;

pub use group::Group;
pub use params::Params;
pub use router::Router;
pub use tree::{Outcome, Resolved, RouteInfo, RouteMethod, Tree};

/// Errors raised while registering routes.
///
/// These are startup errors: a route table that fails to build should abort
/// the process rather than serve a partial table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route `{path}`: {source}")]
    Rule {
        path: String,
        #[source]
        source: RuleError,
    },

    #[error("invalid HTTP method `{0}`")]
    Method(String),
}
