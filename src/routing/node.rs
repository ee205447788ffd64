//! Trie nodes.
//!
//! # Responsibilities
//! - Hold one compiled path segment and its position in the tree
//! - Own the per-method routes registered at this segment
//! - Own the middleware scoped to this subtree
//!
//! # Design Decisions
//! - Nodes live in a flat arena owned by the tree; children and parent are
//!   arena indices, so the parent link is a plain back-reference
//! - Dynamic children are kept in a separate, precedence-sorted list next to
//!   the raw-rule map, so lookups never depend on hash iteration order

use std::cmp::Reverse;
use std::collections::HashMap;

use axum::http::Method;

use crate::http::handler::{Handler, HandlerChain};
use crate::routing::rule::Rule;

/// Index of a node inside the tree arena.
pub type NodeId = usize;

/// The root node always sits at index 0.
pub const ROOT: NodeId = 0;

/// A handler registered for one method, with its cached chain.
#[derive(Debug, Clone)]
pub struct Route {
    pub handler: Handler,
    pub chain: HandlerChain,
}

impl Route {
    pub fn new(handler: Handler) -> Self {
        let chain: HandlerChain = vec![handler.clone()].into();
        Self { handler, chain }
    }
}

#[derive(Debug)]
pub struct Node {
    pub depth: usize,
    /// Segment text exactly as registered.
    pub raw: String,
    /// Registered rules from the root to this node, for diagnostics only.
    pub path: String,
    pub rule: Rule,
    pub parent: Option<NodeId>,
    /// Children keyed by raw rule text.
    pub children: HashMap<String, NodeId>,
    /// Non-literal children in match precedence order.
    pub dynamic: Vec<NodeId>,
    pub routes: HashMap<Method, Route>,
    pub any: Option<Route>,
    pub middleware: Vec<Handler>,
    /// Chain used when the node matches but the method does not.
    pub fallback: HandlerChain,
}

impl Node {
    pub fn new(raw: &str, path: String, rule: Rule, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            depth,
            raw: raw.to_string(),
            path,
            rule,
            parent,
            children: HashMap::new(),
            dynamic: Vec::new(),
            routes: HashMap::new(),
            any: None,
            middleware: Vec::new(),
            fallback: Vec::<Handler>::new().into(),
        }
    }

    /// Returns true if any handler is registered here.
    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty() || self.any.is_some()
    }

    /// Registered methods for the `Allow` header, sorted.
    /// `HEAD` is implied by `GET`.
    pub fn allowed_methods(&self) -> Vec<String> {
        let mut allowed: Vec<String> = self.routes.keys().map(|m| m.to_string()).collect();
        if self.routes.contains_key(&Method::GET) && !self.routes.contains_key(&Method::HEAD) {
            allowed.push(Method::HEAD.to_string());
        }
        allowed.sort();
        allowed
    }

    /// Pick the route for `method`: exact, then `HEAD` served by `GET`,
    /// then `ANY`.
    pub fn route_for(&self, method: &Method) -> Option<&Route> {
        self.routes
            .get(method)
            .or_else(|| {
                if *method == Method::HEAD {
                    self.routes.get(&Method::GET)
                } else {
                    None
                }
            })
            .or(self.any.as_ref())
    }

    /// Sort key for dynamic children: pattern-constrained parameters, then
    /// plain parameters, then prefixed wildcards (longest prefix first), then
    /// the bare wildcard. The sort is stable, so registration order breaks ties.
    pub fn precedence(&self) -> (u8, Reverse<usize>) {
        let rule = &self.rule;
        if rule.wildcard {
            let prefix = rule.wildcard_prefix().len();
            if prefix == 0 {
                (3, Reverse(0))
            } else {
                (2, Reverse(prefix))
            }
        } else if rule.pattern.is_some() {
            (0, Reverse(0))
        } else {
            (1, Reverse(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::compile;

    fn node(raw: &str) -> Node {
        Node::new(raw, format!("/{}", raw), compile(raw).unwrap(), Some(ROOT), 1)
    }

    #[test]
    fn test_precedence_order() {
        let mut nodes = vec![
            node("{*}"),
            node(":user"),
            node(":static*"),
            node(":id"),
            node(":s*"),
        ];
        nodes.sort_by_key(|n| n.precedence());
        let order: Vec<_> = nodes.iter().map(|n| n.raw.as_str()).collect();
        assert_eq!(order, vec![":id", ":user", ":static*", ":s*", "{*}"]);
    }

    #[test]
    fn test_route_for_fallbacks() {
        let mut n = node("x");
        assert!(n.route_for(&Method::GET).is_none());

        n.routes.insert(Method::GET, Route::new(Handler::named("get", |_ctx| {})));
        assert_eq!(n.route_for(&Method::HEAD).unwrap().handler.name(), "get");
        assert!(n.route_for(&Method::POST).is_none());

        n.any = Some(Route::new(Handler::named("any", |_ctx| {})));
        assert_eq!(n.route_for(&Method::POST).unwrap().handler.name(), "any");
        assert_eq!(n.route_for(&Method::GET).unwrap().handler.name(), "get");
    }

    #[test]
    fn test_allowed_methods_imply_head() {
        let mut n = node("x");
        n.routes.insert(Method::POST, Route::new(Handler::named("p", |_ctx| {})));
        n.routes.insert(Method::GET, Route::new(Handler::named("g", |_ctx| {})));
        assert_eq!(n.allowed_methods(), vec!["GET", "HEAD", "POST"]);
    }
}
