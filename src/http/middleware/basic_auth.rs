//! HTTP Basic authentication.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::http::{Context, Handler};

const CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Require one of `credentials` (user → password). Failures answer 401 with
/// a `WWW-Authenticate` challenge and stop the chain.
pub fn basic_auth(credentials: HashMap<String, String>) -> Handler {
    let credentials = Arc::new(credentials);
    Handler::named("basic_auth", move |ctx| {
        let authorized = decode(ctx)
            .map(|(user, pass)| credentials.get(&user).is_some_and(|expected| *expected == pass))
            .unwrap_or(false);

        if authorized {
            ctx.next();
        } else {
            tracing::debug!(request_id = %ctx.request_id(), path = %ctx.path(), "Basic auth rejected");
            ctx.set_header(header::WWW_AUTHENTICATE.as_str(), CHALLENGE);
            ctx.error(StatusCode::UNAUTHORIZED);
        }
    })
}

fn decode(ctx: &Context) -> Option<(String, String)> {
    let value = ctx.authorization()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
