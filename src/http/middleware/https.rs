//! Plain-HTTP to HTTPS upgrade.
//!
//! TLS terminates in front of this server, so "secure" is read from the
//! request URI scheme or the `X-Forwarded-Proto` header set by the proxy.

use axum::http::StatusCode;

use crate::http::{Context, Handler};

/// Redirect insecure requests to the same host and path on `https`,
/// with `port` appended unless it is 443.
pub fn https_redirect(port: u16) -> Handler {
    Handler::named("https_redirect", move |ctx| {
        if is_secure(ctx) {
            ctx.next();
            return;
        }
        let location = secure_location(ctx, port);
        ctx.redirect(StatusCode::MOVED_PERMANENTLY, &location);
    })
}

fn is_secure(ctx: &Context) -> bool {
    ctx.scheme().eq_ignore_ascii_case("https")
}

fn secure_location(ctx: &Context, port: u16) -> String {
    let mut location = format!("https://{}", ctx.host());
    if port != 443 {
        location.push_str(&format!(":{port}"));
    }
    location.push_str(ctx.path());
    if let Some(query) = ctx.uri().query() {
        location.push('?');
        location.push_str(query);
    }
    location
}
