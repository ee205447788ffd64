//! Prefix tree of route rules.
//!
//! # Data Flow
//! ```text
//! Boot (insert):
//!     "/api/users/:id"
//!     → split on '/', skip empty segments
//!     → reuse or create one node per raw segment (rule.rs compiles new ones)
//!     → attach middleware / method route to the terminal node
//!     → rebuild cached chains for the affected subtree
//!
//! Request (find):
//!     "/api/users/42"
//!     → per segment (percent-decoded): literal child, else first accepting dynamic child
//!     → wildcard child captures the rest of the path and stops the walk
//!     → method resolution: exact → HEAD via GET → ANY → 405
//! ```
//!
//! # Design Decisions
//! - `insert` takes `&mut self`, `find` takes `&self`: the borrow checker
//!   enforces "register everything, then share read-only"
//! - Chains are materialized at registration so `find` only clones an `Arc`
//! - A node with no routes at all is a prefix, not a resource: 404, not 405

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use axum::http::Method;
use percent_encoding::percent_decode_str;

use crate::http::errors;
use crate::http::handler::{Handler, HandlerChain};
use crate::routing::node::{Node, NodeId, Route, ROOT};
use crate::routing::params::Params;
use crate::routing::rule::{self, Rule};
use crate::routing::RouteError;

/// Method a route is registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// Fallback for any method without its own handler.
    Any,
    Only(Method),
}

impl RouteMethod {
    /// Parse a method name, case-insensitively. `ANY` is reserved.
    pub fn parse(method: &str) -> Result<Self, RouteError> {
        let upper = method.trim().to_ascii_uppercase();
        if upper == "ANY" {
            return Ok(RouteMethod::Any);
        }
        Method::from_bytes(upper.as_bytes())
            .map(RouteMethod::Only)
            .map_err(|_| RouteError::Method(method.to_string()))
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Any => write!(f, "ANY"),
            RouteMethod::Only(m) => write!(f, "{}", m),
        }
    }
}

/// How a lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found,
    NotFound,
    MethodNotAllowed,
}

impl Outcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Found => "found",
            Outcome::NotFound => "not_found",
            Outcome::MethodNotAllowed => "method_not_allowed",
        }
    }
}

/// Result of [`Tree::find`]: the chain to run and the captured parameters.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub outcome: Outcome,
    pub chain: HandlerChain,
    pub params: Params,
}

/// One registered `(path, method)` pair, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub path: String,
    pub method: String,
    pub middleware: Vec<String>,
    pub handler: String,
}

/// The route trie.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    not_found: HandlerChain,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let root_rule = Rule {
            key: "/".to_string(),
            pattern: None,
            wildcard: false,
            literal: true,
        };
        let mut tree = Self {
            nodes: vec![Node::new("/", "/".to_string(), root_rule, None, 0)],
            not_found: Vec::<Handler>::new().into(),
        };
        tree.rebuild(ROOT);
        tree
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && !self.nodes[ROOT].has_routes()
    }

    /// Register `handler` for `method` at `path`, and append `middleware` to
    /// the terminal node. With no handler, only the middleware is attached.
    ///
    /// Re-registering a method at the same path replaces its handler.
    pub fn insert(
        &mut self,
        method: &str,
        path: &str,
        handler: Option<Handler>,
        middleware: Vec<Handler>,
    ) -> Result<(), RouteError> {
        let method = RouteMethod::parse(method)?;
        let mut current = ROOT;

        for (offset, segment) in segments(path) {
            if self.nodes[current].rule.wildcard {
                tracing::warn!(
                    path = %path,
                    ignored = %&path[offset..],
                    "Segments after a wildcard are ignored"
                );
                break;
            }

            current = match self.nodes[current].children.get(segment) {
                Some(&id) => id,
                None => self.add_child(current, segment, path)?,
            };
        }

        if !middleware.is_empty() {
            self.nodes[current].middleware.extend(middleware);
            self.rebuild_subtree(current);
        }

        if let Some(handler) = handler {
            let node = &mut self.nodes[current];
            tracing::debug!(method = %method, path = %node.path, handler = handler.name(), "Route registered");
            match method {
                RouteMethod::Any => node.any = Some(Route::new(handler)),
                RouteMethod::Only(m) => {
                    node.routes.insert(m, Route::new(handler));
                }
            }
            self.rebuild(current);
        }

        Ok(())
    }

    /// Resolve `path` and `method` to a handler chain.
    ///
    /// Never fails: unmatched paths and methods resolve to the not-found and
    /// method-not-allowed chains.
    pub fn find(&self, path: &str, method: &Method) -> Resolved {
        let mut params = Params::new();
        let mut current = ROOT;

        for (offset, raw) in segments(path) {
            let node = &self.nodes[current];
            let segment = decode(raw);

            if let Some(&id) = node.children.get(segment.as_ref()) {
                if self.nodes[id].rule.literal {
                    current = id;
                    continue;
                }
            }

            let rest = decode(&path[offset..]);
            let next = node.dynamic.iter().copied().find(|&id| {
                let rule = &self.nodes[id].rule;
                if rule.wildcard {
                    rest.starts_with(rule.wildcard_prefix())
                } else {
                    rule.accepts(&segment)
                }
            });

            match next {
                Some(id) if self.nodes[id].rule.wildcard => {
                    params.push(&self.nodes[id].rule.key, &rest);
                    current = id;
                    break;
                }
                Some(id) => {
                    params.push(&self.nodes[id].rule.key, &segment);
                    current = id;
                }
                None => return self.not_found(),
            }
        }

        let node = &self.nodes[current];
        if let Some(route) = node.route_for(method) {
            return Resolved {
                outcome: Outcome::Found,
                chain: route.chain.clone(),
                params,
            };
        }

        if !node.has_routes() {
            return self.not_found();
        }

        Resolved {
            outcome: Outcome::MethodNotAllowed,
            chain: node.fallback.clone(),
            params,
        }
    }

    /// Every registered `(path, method)` pair in registration order of their
    /// nodes, methods sorted within a node and `ANY` last.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut out = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            let middleware: Vec<String> = self
                .middleware_for(id)
                .iter()
                .map(|h| h.name().to_string())
                .collect();

            let mut methods: Vec<(&Method, &Route)> = node.routes.iter().collect();
            methods.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

            let listed = methods
                .into_iter()
                .map(|(m, r)| (m.to_string(), r))
                .chain(node.any.iter().map(|r| ("ANY".to_string(), r)));

            for (method, route) in listed {
                out.push(RouteInfo {
                    path: node.path.clone(),
                    method,
                    middleware: middleware.clone(),
                    handler: route.handler.name().to_string(),
                });
            }
        }
        out
    }

    fn not_found(&self) -> Resolved {
        Resolved {
            outcome: Outcome::NotFound,
            chain: self.not_found.clone(),
            params: Params::new(),
        }
    }

    fn add_child(&mut self, parent: NodeId, raw: &str, full: &str) -> Result<NodeId, RouteError> {
        let rule = rule::compile(raw).map_err(|source| RouteError::Rule {
            path: full.to_string(),
            source,
        })?;

        let id = self.nodes.len();
        let parent_node = &self.nodes[parent];
        let path = if parent == ROOT {
            format!("/{}", raw)
        } else {
            format!("{}/{}", parent_node.path, raw)
        };
        let depth = parent_node.depth + 1;
        let dynamic = !rule.literal;

        self.nodes.push(Node::new(raw, path, rule, Some(parent), depth));

        let parent_node = &mut self.nodes[parent];
        parent_node.children.insert(raw.to_string(), id);
        if dynamic {
            parent_node.dynamic.push(id);
            let mut order = std::mem::take(&mut self.nodes[parent].dynamic);
            order.sort_by_key(|&child| self.nodes[child].precedence());
            self.nodes[parent].dynamic = order;
        }

        Ok(id)
    }

    /// Middleware from the root down to `id`, inclusive.
    fn middleware_for(&self, id: NodeId) -> Vec<Handler> {
        let mut lineage = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            lineage.push(current);
            cursor = self.nodes[current].parent;
        }

        lineage
            .into_iter()
            .rev()
            .flat_map(|n| self.nodes[n].middleware.iter().cloned())
            .collect()
    }

    fn chain_for(&self, id: NodeId, terminal: Handler) -> HandlerChain {
        let mut chain = self.middleware_for(id);
        chain.push(terminal);
        chain.into()
    }

    /// Recompute every cached chain held by `id`.
    fn rebuild(&mut self, id: NodeId) {
        let node = &self.nodes[id];

        let routes: HashMap<Method, Route> = node
            .routes
            .iter()
            .map(|(m, r)| {
                let chain = self.chain_for(id, r.handler.clone());
                (m.clone(), Route { handler: r.handler.clone(), chain })
            })
            .collect();
        let any = node.any.as_ref().map(|r| Route {
            handler: r.handler.clone(),
            chain: self.chain_for(id, r.handler.clone()),
        });
        let fallback = self.chain_for(id, errors::method_not_allowed(node.allowed_methods()));

        if id == ROOT {
            self.not_found = self.chain_for(ROOT, errors::not_found());
        }

        let node = &mut self.nodes[id];
        node.routes = routes;
        node.any = any;
        node.fallback = fallback;
    }

    fn rebuild_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.rebuild(current);
            stack.extend(self.nodes[current].children.values().copied());
        }
    }
}

/// Non-empty segments of `path`, with their byte offsets.
/// Percent-decode a request path piece. Invalid UTF-8 is replaced.
fn decode(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

fn segments(path: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let mut offset = 0;
    path.split('/').filter_map(move |segment| {
        let start = offset;
        offset += segment.len() + 1;
        (!segment.is_empty()).then_some((start, segment))
    })
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in self.routes() {
            write!(f, "{:<8} {}", route.method, route.path)?;
            if !route.middleware.is_empty() {
                write!(f, " [{}]", route.middleware.join(", "))?;
            }
            writeln!(f, " -> {}", route.handler)?;
        }
        Ok(())
    }
}
