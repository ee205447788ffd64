//! Advisory per-subtree deadlines.
//!
//! Handlers run synchronously and are never interrupted. This middleware
//! only tightens the deadline they can observe through
//! [`Context::is_expired`](crate::http::Context::is_expired) and
//! [`Context::remaining`](crate::http::Context::remaining).

use std::time::{Duration, Instant};

use crate::http::Handler;

/// Give the rest of the chain at most `limit`. An earlier deadline set
/// further up the chain is kept; the previous deadline is restored on return.
pub fn timeout(limit: Duration) -> Handler {
    Handler::named("timeout", move |ctx| {
        let previous = ctx.deadline();
        let candidate = Instant::now() + limit;
        let tightened = match previous {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };

        ctx.set_deadline(Some(tightened));
        ctx.next();
        ctx.set_deadline(previous);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Context, ErrorPages};
    use crate::routing::{Outcome, Params, Resolved};
    use axum::body::Bytes;
    use axum::http::Request;
    use std::sync::{Arc, Mutex};

    fn run(chain: Vec<Handler>, outer: Option<Instant>) -> Context {
        let mut ctx = Context::new(Arc::new(ErrorPages::new()));
        let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        ctx.prepare(
            request,
            None,
            Resolved {
                outcome: Outcome::Found,
                chain: chain.into(),
                params: Params::new(),
            },
        );
        ctx.set_deadline(outer);
        ctx.dispatch();
        ctx
    }

    #[test]
    fn test_installs_and_restores_deadline() {
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let ctx = run(
            vec![
                timeout(Duration::from_secs(5)),
                Handler::named("observe_deadline", move |ctx| *slot.lock().unwrap() = ctx.remaining()),
            ],
            None,
        );

        let remaining = seen.lock().unwrap().expect("deadline visible downstream");
        assert!(remaining <= Duration::from_secs(5));
        assert!(remaining > Duration::from_secs(4));
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_keeps_tighter_outer_deadline() {
        let outer = Instant::now() + Duration::from_millis(10);
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let ctx = run(
            vec![
                timeout(Duration::from_secs(60)),
                Handler::named("observe_deadline", move |ctx| *slot.lock().unwrap() = ctx.deadline()),
            ],
            Some(outer),
        );

        assert_eq!(*seen.lock().unwrap(), Some(outer));
        assert_eq!(ctx.deadline(), Some(outer));
    }
}
