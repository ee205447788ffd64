//! Error pages.
//!
//! # Responsibilities
//! - Map status codes to custom handlers
//! - Fall back to "status + reason phrase" when none is registered
//! - Provide the stand-in terminals used for 404 and 405 chains
//!
//! # Design Decisions
//! - The registry is built with the router and frozen with it; it is
//!   handed to every context explicitly instead of living in a global

use std::collections::HashMap;

use axum::http::{header, StatusCode};

use crate::http::context::Context;
use crate::http::handler::Handler;

/// Status code → handler registry.
#[derive(Debug, Clone, Default)]
pub struct ErrorPages {
    handlers: HashMap<StatusCode, Handler>,
}

impl ErrorPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom page for `code`, replacing any previous one.
    pub fn set(&mut self, code: StatusCode, handler: Handler) {
        self.handlers.insert(code, handler);
    }

    pub fn get(&self, code: StatusCode) -> Option<&Handler> {
        self.handlers.get(&code)
    }

    /// Render the page for `code` into `ctx`.
    ///
    /// The status is set before a custom handler runs, so a handler that
    /// only writes a body still answers with `code`.
    pub fn render(&self, code: StatusCode, ctx: &mut Context) {
        ctx.status(code);
        match self.handlers.get(&code) {
            Some(handler) => handler.call(ctx),
            None => default_page(code, ctx),
        }
    }
}

fn default_page(code: StatusCode, ctx: &mut Context) {
    let reason = code.canonical_reason().unwrap_or("");
    ctx.text(code, reason);
}

/// Terminal handler for paths that matched no route.
pub fn not_found() -> Handler {
    Handler::named("not_found", |ctx| ctx.error(StatusCode::NOT_FOUND))
}

/// Terminal handler for a matched path without a handler for the method.
pub fn method_not_allowed(allowed: Vec<String>) -> Handler {
    let allow = allowed.join(", ");
    Handler::named("method_not_allowed", move |ctx| {
        if !allow.is_empty() {
            ctx.set_header(header::ALLOW.as_str(), &allow);
        }
        ctx.error(StatusCode::METHOD_NOT_ALLOWED)
    })
}
