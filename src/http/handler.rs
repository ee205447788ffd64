//! Handler and handler chain types.
//!
//! Every element of a chain, middleware or terminal, has the same shape:
//! a synchronous function of the request [`Context`]. Middleware decides
//! whether and when to continue by calling [`Context::next`].

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::http::context::Context;

type HandlerFn = dyn Fn(&mut Context) + Send + Sync;

/// A named, cheaply clonable chain element.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    func: Arc<HandlerFn>,
}

impl Handler {
    /// Wrap a function, naming it after its Rust type.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self::named(type_name::<F>(), func)
    }

    /// Wrap a function under an explicit name (shown in route listings).
    pub fn named<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the handler.
    #[inline]
    pub fn call(&self, ctx: &mut Context) {
        (self.func)(ctx)
    }

    /// Returns true if both values wrap the same function allocation.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.name).finish()
    }
}

/// Fully resolved middleware + terminal handler sequence.
///
/// Chains are built once at registration and shared by every request that
/// resolves to the same (node, method) pair.
pub type HandlerChain = Arc<[Handler]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_handler() {
        let h = Handler::named("ping", |_ctx| {});
        assert_eq!(h.name(), "ping");
        assert_eq!(format!("{:?}", h), "Handler(\"ping\")");
    }

    #[test]
    fn test_type_name_default() {
        fn index(_: &mut Context) {}
        let h = Handler::new(index);
        assert!(h.name().ends_with("index"));
    }

    #[test]
    fn test_clone_shares_function() {
        let a = Handler::named("a", |_ctx| {});
        let b = a.clone();
        let c = Handler::named("a", |_ctx| {});
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
