//! The frozen, shareable route table.
//!
//! # Data Flow
//! ```text
//! Request<Bytes> + peer address
//!     → tree.find(path, method)          (chain + params, or 404/405 chain)
//!     → pool.acquire() → ctx.prepare()   (fresh request state)
//!     → ctx.dispatch()                   (middleware → handler, synchronously)
//!     → ctx.take_response()              (buffered status, headers, body)
//!     → pool.release(ctx)
//! ```
//!
//! # Design Decisions
//! - `App` has no interior mutability apart from the pool, so it is shared
//!   across workers behind a plain `Arc`
//! - A panic escaping the chain unwinds through `dispatch`; the context is
//!   dropped instead of being returned to the pool

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, Response};

use crate::http::errors::ErrorPages;
use crate::http::pool::ContextPool;
use crate::observability::metrics;
use crate::routing::{Resolved, RouteInfo, Tree};

/// Immutable router produced by [`Router::build`](crate::routing::Router::build).
#[derive(Debug)]
pub struct App {
    tree: Tree,
    errors: Arc<ErrorPages>,
    pool: ContextPool,
    deadline: Option<Duration>,
}

impl App {
    pub(crate) fn new(tree: Tree, errors: ErrorPages, pool_capacity: usize, deadline: Option<Duration>) -> Self {
        let errors = Arc::new(errors);
        let pool = ContextPool::new(Arc::clone(&errors), pool_capacity);
        Self {
            tree,
            errors,
            pool,
            deadline,
        }
    }

    /// Resolve without dispatching.
    pub fn find(&self, path: &str, method: &Method) -> Resolved {
        self.tree.find(path, method)
    }

    /// Run the full chain for `request` and return the buffered response.
    pub fn dispatch(&self, request: Request<Bytes>, remote_addr: Option<SocketAddr>) -> Response<Body> {
        let resolved = self.tree.find(request.uri().path(), request.method());
        let outcome = resolved.outcome;
        let method = request.method().clone();

        let mut ctx = self.pool.acquire();
        ctx.prepare(request, remote_addr, resolved);
        if let Some(deadline) = self.deadline {
            ctx.set_deadline(Some(ctx.started() + deadline));
        }

        tracing::trace!(
            request_id = %ctx.request_id(),
            method = %method,
            path = %ctx.path(),
            outcome = ?outcome,
            chain = ctx.chain().len(),
            "Dispatching request"
        );

        ctx.dispatch();

        let status = ctx.status_code();
        metrics::record_request(method.as_str(), status.as_u16(), outcome.as_str(), ctx.started());

        let response = ctx.take_response();
        self.pool.release(ctx);
        response
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.tree.routes()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn errors(&self) -> &ErrorPages {
        &self.errors
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}
