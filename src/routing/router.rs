//! Route registration front end.
//!
//! # Responsibilities
//! - Offer per-method registration shortcuts over the tree
//! - Collect custom error pages
//! - Freeze the registration state into an immutable [`App`]
//!
//! # Design Decisions
//! - Every registration call returns `Result`; callers propagate with `?`
//!   so a bad route aborts startup
//! - `build` consumes the router: nothing can be registered once serving

use std::time::Duration;

use axum::http::StatusCode;

use crate::http::app::App;
use crate::http::errors::ErrorPages;
use crate::http::Handler;
use crate::routing::group::Group;
use crate::routing::tree::Tree;
use crate::routing::RouteError;

/// Default number of idle contexts kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 256;

/// Mutable route table used during boot.
#[derive(Debug)]
pub struct Router {
    tree: Tree,
    errors: ErrorPages,
    pool_capacity: usize,
    deadline: Option<Duration>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            errors: ErrorPages::new(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
            deadline: None,
        }
    }

    /// Register `handler` under `method` (case-insensitive, `ANY` for all).
    pub fn handle(&mut self, method: &str, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.insert(method, path, Some(handler), Vec::new())
    }

    /// Raw registration: optional handler plus middleware for the node at
    /// `path`. Middleware attached here runs for every route below `path`.
    pub fn insert(
        &mut self,
        method: &str,
        path: &str,
        handler: Option<Handler>,
        middleware: Vec<Handler>,
    ) -> Result<&mut Self, RouteError> {
        self.tree.insert(method, path, handler, middleware)?;
        Ok(self)
    }

    method_shortcuts! {
        get => "GET";
        post => "POST";
        put => "PUT";
        patch => "PATCH";
        delete => "DELETE";
        head => "HEAD";
        options => "OPTIONS";
        any => "ANY";
    }

    /// Attach middleware at the root; it runs first for every request,
    /// including unmatched ones.
    pub fn layer(&mut self, middleware: Handler) -> Result<&mut Self, RouteError> {
        self.insert("ANY", "/", None, vec![middleware])
    }

    /// Start a group of routes sharing `prefix`.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, prefix)
    }

    /// Replace the page rendered for `code` (404, 405, 500, ...).
    pub fn error_handler(&mut self, code: StatusCode, handler: Handler) -> &mut Self {
        self.errors.set(code, handler);
        self
    }

    /// Number of idle contexts the built app keeps for reuse.
    pub fn pool_capacity(&mut self, capacity: usize) -> &mut Self {
        self.pool_capacity = capacity;
        self
    }

    /// Advisory deadline installed on every context, measured from the
    /// start of dispatch.
    pub fn deadline(&mut self, deadline: Option<Duration>) -> &mut Self {
        self.deadline = deadline;
        self
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Finish registration.
    pub fn build(self) -> App {
        tracing::info!(
            nodes = self.tree.len(),
            routes = self.tree.routes().len(),
            "Route table built"
        );
        App::new(self.tree, self.errors, self.pool_capacity, self.deadline)
    }
}
