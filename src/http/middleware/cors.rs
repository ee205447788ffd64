//! CORS preflight handling.
//!
//! Non-`OPTIONS` requests continue down the chain, tagged with
//! `Access-Control-Allow-Origin` when the origin is allowed. `OPTIONS`
//! requests are answered here and never reach a route handler.

use std::sync::Arc;

use axum::http::{header, Method, StatusCode};

use crate::config::CorsConfig;
use crate::http::{Context, Handler};

#[derive(Debug)]
struct Policy {
    any_origin: bool,
    origins: Vec<String>,
    methods: String,
    headers: String,
    max_age: String,
}

impl Policy {
    fn from_config(config: &CorsConfig) -> Self {
        Self {
            any_origin: config.allowed_origins.iter().any(|o| o == "*"),
            origins: config.allowed_origins.clone(),
            methods: config.allowed_methods.join(", "),
            headers: config.allowed_headers.join(", "),
            max_age: config.max_age_secs.to_string(),
        }
    }

    /// Value for `Access-Control-Allow-Origin`, or `None` when refused.
    fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        if self.any_origin {
            return Some("*".to_string());
        }
        let origin = origin?;
        self.origins
            .iter()
            .any(|o| o.eq_ignore_ascii_case(origin))
            .then(|| origin.to_string())
    }
}

pub fn cors(config: &CorsConfig) -> Handler {
    let policy = Arc::new(Policy::from_config(config));
    Handler::named("cors", move |ctx| apply(&policy, ctx))
}

fn apply(policy: &Policy, ctx: &mut Context) {
    let allowed = policy.allow_origin(ctx.header(header::ORIGIN.as_str()));

    if *ctx.method() != Method::OPTIONS {
        if let Some(origin) = &allowed {
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN.as_str(), origin);
            ctx.set_header(header::VARY.as_str(), "Origin");
        }
        ctx.next();
        return;
    }

    match allowed {
        Some(origin) => {
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN.as_str(), &origin);
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_METHODS.as_str(), &policy.methods);
            let headers = ctx
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| policy.headers.clone());
            if !headers.is_empty() {
                ctx.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS.as_str(), &headers);
            }
            ctx.set_header(header::ACCESS_CONTROL_MAX_AGE.as_str(), &policy.max_age);
            ctx.status(StatusCode::NO_CONTENT);
        }
        None => {
            tracing::debug!(
                request_id = %ctx.request_id(),
                origin = ctx.header(header::ORIGIN.as_str()).unwrap_or("-"),
                "Preflight from disallowed origin"
            );
            ctx.error(StatusCode::FORBIDDEN);
        }
    }
}
