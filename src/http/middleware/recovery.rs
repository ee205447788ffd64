//! Access logging and panic recovery.
//!
//! # Responsibilities
//! - Emit one access log line per request, after the chain has run
//! - Catch panics from anything further down the chain
//! - Log the panic message, the request line and the panic-site backtrace
//! - Replace the partial response with the registered 500 page
//!
//! # Design Decisions
//! - The backtrace is captured by a panic hook, because by the time
//!   `catch_unwind` returns the panicking frames are gone
//! - The hook only swallows the default stderr report while a recovery
//!   frame is active on the current thread; other panics are untouched

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use axum::http::StatusCode;

use crate::http::{Context, Handler};
use crate::observability::metrics;

thread_local! {
    static RECOVERY_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Outermost middleware: access log plus panic isolation.
pub fn recovery() -> Handler {
    install_hook();
    Handler::named("recovery", |ctx| {
        RECOVERY_DEPTH.with(|d| d.set(d.get() + 1));
        let result = panic::catch_unwind(AssertUnwindSafe(|| ctx.next()));
        RECOVERY_DEPTH.with(|d| d.set(d.get() - 1));

        if let Err(payload) = result {
            let backtrace = LAST_BACKTRACE
                .with(|slot| slot.borrow_mut().take())
                .map(|bt| bt.to_string())
                .unwrap_or_default();
            let request_line = format!("{} {} {:?}", ctx.method(), ctx.uri(), ctx.request().version());
            tracing::error!(
                request_id = %ctx.request_id(),
                request = %request_line,
                panic = %panic_message(payload.as_ref()),
                backtrace = %backtrace,
                "Handler panicked"
            );
            metrics::record_panic();

            ctx.clear_response();
            ctx.error(StatusCode::INTERNAL_SERVER_ERROR);
        }

        tracing::info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = ctx.status_code().as_u16(),
            client_ip = ctx.client_ip().as_deref().unwrap_or("-"),
            elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
            "Request completed"
        );
    })
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if RECOVERY_DEPTH.with(Cell::get) > 0 {
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            } else {
                previous(info);
            }
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ErrorPages;
    use crate::routing::{Outcome, Params, Resolved};
    use axum::body::Bytes;
    use axum::http::Request;
    use std::sync::Arc;

    fn run(chain: Vec<Handler>) -> Context {
        let mut ctx = Context::new(Arc::new(ErrorPages::new()));
        let request = Request::builder().uri("/boom").body(Bytes::new()).unwrap();
        let resolved = Resolved {
            outcome: Outcome::Found,
            chain: chain.into(),
            params: Params::new(),
        };
        ctx.prepare(request, None, resolved);
        ctx.dispatch();
        ctx
    }

    #[test]
    fn test_panic_becomes_500() {
        let ctx = run(vec![
            recovery(),
            Handler::named("boom", |ctx| {
                ctx.set_header("x-partial", "yes");
                ctx.write("half a body");
                panic!("kaboom");
            }),
        ]);
        assert_eq!(ctx.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.response_body(), b"Internal Server Error");
        assert_eq!(ctx.response_header("x-partial"), None);
    }

    #[test]
    fn test_passes_through_without_panic() {
        let ctx = run(vec![
            recovery(),
            Handler::named("ok", |ctx| ctx.text(StatusCode::OK, "fine")),
        ]);
        assert_eq!(ctx.status_code(), StatusCode::OK);
        assert_eq!(ctx.response_body(), b"fine");
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
