use std::collections::HashMap;
use std::sync::Arc;

use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::router::node::{Handler, Middleware, RouteNode, RouteParams};

/// Result of matching a request against the route table.
///
/// `NotFound` and `MethodNotAllowed` are normal outcomes, not errors: the
/// caller answers them with a 404 or a 405 carrying the enumerated `Allow`
/// set. A middleware veto is its own variant so it is never mistaken for a
/// missing route.
pub enum RouteOutcome {
    Matched { handler: Handler, params: RouteParams },
    NotFound,
    MethodNotAllowed(Vec<Method>),
    MiddlewareRejected,
}

/// A group of routes sharing a path prefix and a middleware list.
#[derive(Clone, Default)]
pub struct RouteGroup {
    prefix: String,
    middlewares: Vec<Middleware>,
}

impl RouteGroup {
    pub fn new(prefix: &str) -> Self {
        let prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        };
        Self { prefix, middlewares: Vec::new() }
    }

    pub fn with_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }
}

/// Collapses repeated slashes, forces a leading slash and strips the trailing
/// slash (except for `/` itself), so `/api//user/` and `/api/user` land on
/// the same route.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    let mut last_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !last_was_slash {
                normalized.push('/');
                last_was_slash = true;
            }
        } else {
            normalized.push(c);
            last_was_slash = false;
        }
    }

    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

fn is_static_path(path: &str) -> bool {
    !path.contains(':') && !path.contains('*')
}

/// The route table: a segment trie for parametric patterns plus a flat map
/// fast path for fully static ones.
///
/// Built by startup code through `&mut self` registrations, then shared
/// immutably (`Arc<Router>`) with every connection task, so concurrent
/// matching needs no locking. The static index is always redundant with the
/// trie; the trie stays authoritative for method-not-allowed enumeration.
///
/// Registration collisions are last-wins: a node holds a single anonymous
/// parameter child and a single wildcard child, so re-registering a method at
/// the same structural position (even under a different parameter name)
/// silently replaces the earlier binding.
pub struct Router {
    root: RouteNode,
    static_index: HashMap<String, HashMap<Method, Handler>>,
    global_middleware: Vec<Middleware>,
    path_middleware: HashMap<String, Vec<Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            root: RouteNode::new(),
            static_index: HashMap::new(),
            global_middleware: Vec::new(),
            path_middleware: HashMap::new(),
        }
    }

    /// Registers a handler for `method` on a path pattern. Segments starting
    /// with `:` bind parameters, a final `*` captures all remaining segments.
    pub fn add_route(&mut self, method: Method, path: &str, handler: Handler) {
        let path = normalize_path(path);
        self.root.insert(method, &path, handler.clone());
        if is_static_path(&path) {
            self.static_index
                .entry(path)
                .or_default()
                .insert(method, handler);
        }
    }

    pub fn get<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::GET, path, Arc::new(handler));
    }

    pub fn post<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::POST, path, Arc::new(handler));
    }

    pub fn put<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::PUT, path, Arc::new(handler));
    }

    pub fn delete<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::DELETE, path, Arc::new(handler));
    }

    pub fn patch<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::PATCH, path, Arc::new(handler));
    }

    pub fn head<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::HEAD, path, Arc::new(handler));
    }

    pub fn options<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync + 'static,
    {
        self.add_route(Method::OPTIONS, path, Arc::new(handler));
    }

    /// Registers a route under a group's prefix and attaches the group's
    /// middleware to the joined path.
    pub fn add_route_in_group(
        &mut self,
        group: &RouteGroup,
        method: Method,
        path: &str,
        handler: Handler,
    ) {
        let full = normalize_path(&format!("{}/{}", group.prefix, path));
        self.add_route(method, &full, handler);
        if !group.middlewares.is_empty() {
            let entry = self.path_middleware.entry(full).or_default();
            entry.extend(group.middlewares.iter().cloned());
        }
    }

    /// Adds a middleware that runs for every request, in registration order.
    pub fn add_middleware<F>(&mut self, middleware: F)
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.global_middleware.push(Arc::new(middleware));
    }

    /// Adds a middleware that runs only for one exact (normalized) path.
    pub fn add_middleware_for_path<F>(&mut self, path: &str, middleware: F)
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.path_middleware
            .entry(normalize_path(path))
            .or_default()
            .push(Arc::new(middleware));
    }

    /// Drops every route and middleware.
    pub fn clear(&mut self) {
        self.root.clear();
        self.static_index.clear();
        self.global_middleware.clear();
        self.path_middleware.clear();
    }

    /// Matches a request against the table.
    ///
    /// Middleware runs first (global, then per-path, in registration order);
    /// then the static index is probed; then the trie is walked. When only
    /// the method misses, the walk still completes so the outcome carries the
    /// full set of methods registered at that path.
    pub fn match_route(&self, request: &Request) -> RouteOutcome {
        let path = normalize_path(request.path());

        for middleware in &self.global_middleware {
            if !(middleware.as_ref())(request) {
                return RouteOutcome::MiddlewareRejected;
            }
        }
        if let Some(middlewares) = self.path_middleware.get(&path) {
            for middleware in middlewares {
                if !(middleware.as_ref())(request) {
                    return RouteOutcome::MiddlewareRejected;
                }
            }
        }

        if let Some(methods) = self.static_index.get(&path) {
            if let Some(handler) = methods.get(&request.method) {
                let params = RouteParams {
                    query: request.query_params().clone(),
                    ..RouteParams::default()
                };
                return RouteOutcome::Matched { handler: handler.clone(), params };
            }
            // Method miss on a static path: fall through to the trie, which
            // owns the complete Allow enumeration.
        }

        let found = self.root.find(request.method, &path);
        if let Some(handler) = found.handler {
            let params = RouteParams {
                params: found.params,
                wildcards: found.wildcards,
                query: request.query_params().clone(),
            };
            return RouteOutcome::Matched { handler, params };
        }

        if found.path_matched {
            let mut allowed = found.allowed;
            allowed.sort();
            allowed.dedup();
            return RouteOutcome::MethodNotAllowed(allowed);
        }

        RouteOutcome::NotFound
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
