//! Reusable context pool.
//!
//! Contexts are checked out per request and returned once the response has
//! been taken. A returned context is reset before it goes back on the shelf,
//! so nothing from one request can be observed by the next.

use std::sync::{Arc, Mutex};

use crate::http::context::Context;
use crate::http::errors::ErrorPages;

/// Bounded shelf of idle contexts.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Context>>,
    capacity: usize,
    errors: Arc<ErrorPages>,
}

impl ContextPool {
    pub fn new(errors: Arc<ErrorPages>, capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            errors,
        }
    }

    /// Take an idle context, or build a fresh one when the shelf is empty.
    pub fn acquire(&self) -> Context {
        let recycled = match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        recycled.unwrap_or_else(|| Context::new(Arc::clone(&self.errors)))
    }

    /// Reset `ctx` and shelve it. Dropped when the shelf is full.
    pub fn release(&self, mut ctx: Context) {
        ctx.reset();
        let mut idle = match self.idle.lock() {
            Ok(idle) => idle,
            Err(poisoned) => poisoned.into_inner(),
        };
        if idle.len() < self.capacity {
            idle.push(ctx);
        }
    }

    /// Number of idle contexts.
    pub fn idle(&self) -> usize {
        match self.idle.lock() {
            Ok(idle) => idle.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_release_resets_and_reuses() {
        let pool = ContextPool::new(Arc::new(ErrorPages::new()), 2);
        let mut ctx = pool.acquire();
        ctx.text(StatusCode::IM_A_TEAPOT, "leftover");
        pool.release(ctx);
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert_eq!(ctx.status_code(), StatusCode::OK);
        assert!(ctx.response_body().is_empty());
    }

    #[test]
    fn test_capacity_bounds_shelf() {
        let pool = ContextPool::new(Arc::new(ErrorPages::new()), 1);
        let (a, b) = (pool.acquire(), pool.acquire());
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 1);
    }
}
