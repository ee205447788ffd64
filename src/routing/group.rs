//! Route groups sharing a path prefix and its middleware.

use crate::http::Handler;
use crate::routing::router::Router;
use crate::routing::RouteError;

/// Routes registered under a common prefix.
///
/// ```
/// # use waymark::{Handler, Router, StatusCode};
/// # fn main() -> Result<(), waymark::routing::RouteError> {
/// let mut router = Router::new();
/// router
///     .group("/api/v1")
///     .layer(Handler::named("auth", |ctx| ctx.next()))?
///     .get("/ping", Handler::named("ping", |ctx| ctx.text(StatusCode::OK, "pong")))?;
/// # Ok(())
/// # }
/// ```
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str) -> Self {
        Self {
            router,
            prefix: normalize_prefix(prefix),
        }
    }

    /// The normalized prefix, always starting and ending with `/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Attach middleware to the prefix node; every route below it inherits it.
    pub fn layer(&mut self, middleware: Handler) -> Result<&mut Self, RouteError> {
        self.router.insert("ANY", &self.prefix, None, vec![middleware])?;
        Ok(self)
    }

    /// Register `handler` under `method` at `prefix + target`.
    pub fn handle(&mut self, method: &str, target: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        let path = self.join(target);
        self.router.handle(method, &path, handler)?;
        Ok(self)
    }

    method_shortcuts! {
        get => "GET";
        post => "POST";
        put => "PUT";
        patch => "PATCH";
        delete => "DELETE";
        head => "HEAD";
        options => "OPTIONS";
        any => "ANY";
    }

    /// A nested group below this one.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let nested = self.join(prefix);
        Group::new(&mut *self.router, &nested)
    }

    fn join(&self, target: &str) -> String {
        format!("{}{}", self.prefix, target.trim_start_matches('/'))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn h(name: &'static str) -> Handler {
        Handler::named(name, |_ctx| {})
    }

    fn names(router: &Router, path: &str) -> Vec<String> {
        router
            .tree()
            .find(path, &Method::GET)
            .chain
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "/");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("api"), "/api/");
        assert_eq!(normalize_prefix("/api/v1/"), "/api/v1/");
    }

    #[test]
    fn test_group_layers_and_targets() -> Result<(), RouteError> {
        let mut router = Router::new();
        router.group("api").layer(h("m1"))?.get("/users", h("users"))?;
        router
            .group("/api/v1")
            .layer(h("m2"))?
            .get("ping", h("ping"))?
            .get("", h("v1_index"))?;

        assert_eq!(names(&router, "/api/users"), vec!["m1", "users"]);
        assert_eq!(names(&router, "/api/v1/ping"), vec!["m1", "m2", "ping"]);
        assert_eq!(names(&router, "/api/v1"), vec!["m1", "m2", "v1_index"]);
        Ok(())
    }

    #[test]
    fn test_nested_group() -> Result<(), RouteError> {
        let mut router = Router::new();
        let mut api = router.group("/api");
        api.layer(h("api"))?;
        api.group("admin").layer(h("admin"))?.get("/stats", h("stats"))?;

        assert_eq!(names(&router, "/api/admin/stats"), vec!["api", "admin", "stats"]);
        Ok(())
    }
}
