//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Each entry remembers the
//! template it was registered under so instrumentation can label requests by
//! route rather than by literal path.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{self, BoxedHandler, Handler};

struct Route {
    handler: BoxedHandler,
    template: Arc<str>,
}

/// The outcome of a lookup: what to run and how the request matched.
pub(crate) struct Matched {
    pub handler: BoxedHandler,
    pub template: Option<Arc<str>>,
    pub params: HashMap<String, String>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), fallback: handler::not_found.into_boxed_handler() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves
    /// them and `req.route_template()` returns the path as registered:
    ///
    /// ```rust,no_run
    /// # use promux::{Request, ResponseWriter, Router};
    /// # use http::Method;
    /// # fn get_item(_: &mut dyn ResponseWriter, _: &Request) {}
    /// # fn put_item(_: &mut dyn ResponseWriter, _: &Request) {}
    /// Router::new()
    ///     .on(Method::GET, "/items/{id}", get_item)
    ///     .on(Method::PUT, "/items/{id}", put_item);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route = Route { handler: handler.into_boxed_handler(), template: Arc::from(path) };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Replace the handler that serves requests no route matched.
    ///
    /// Requests reaching the fallback have no route template.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.fallback = handler.into_boxed_handler();
        self
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Matched {
        let found = self.routes.get(method).and_then(|tree| tree.at(path).ok());
        match found {
            Some(matched) => Matched {
                handler: Arc::clone(&matched.value.handler),
                template: Some(Arc::clone(&matched.value.template)),
                params: matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
            },
            None => Matched {
                handler: Arc::clone(&self.fallback),
                template: None,
                params: HashMap::new(),
            },
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
