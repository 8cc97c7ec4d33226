use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// A route handler: receives the request, the response under construction and
/// the extracted parameters; returns `false` to abort processing.
pub type Handler = Arc<dyn Fn(&Request, &mut Response, &RouteParams) -> bool + Send + Sync>;

/// A middleware: inspects the request before matching; returns `false` to
/// reject it.
pub type Middleware = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Parameters extracted while matching a route.
#[derive(Debug, Clone, Default)]
pub struct RouteParams {
    pub(crate) params: HashMap<String, String>,
    pub(crate) wildcards: Vec<String>,
    pub(crate) query: BTreeMap<String, Vec<String>>,
}

impl RouteParams {
    /// Value bound to a named path parameter (`/user/:id` → `param("id")`).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First path segment captured by a wildcard, if any.
    pub fn wildcard(&self) -> Option<&str> {
        self.wildcards.first().map(String::as_str)
    }

    /// Every segment captured by a wildcard, in order.
    pub fn wildcard_parts(&self) -> &[String] {
        &self.wildcards
    }

    /// First value for a query key.
    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value for a query key, supporting repeated keys.
    pub fn query_all(&self, key: &str) -> &[String] {
        self.query.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_query(&self, key: &str) -> bool {
        self.query.contains_key(key)
    }
}

#[derive(Clone)]
struct Binding {
    handler: Handler,
    // Parameter names declared by the registering route, positionally paired
    // with the segment values collected during the walk. The parameter node
    // itself is anonymous and shared between routes.
    param_names: Vec<String>,
}

/// Result of a trie walk: the handler when method and path both matched, plus
/// everything needed for a 405 (`allowed`) when only the path did.
#[derive(Default)]
pub(crate) struct NodeMatch {
    pub handler: Option<Handler>,
    pub params: HashMap<String, String>,
    pub wildcards: Vec<String>,
    pub allowed: Vec<Method>,
    pub path_matched: bool,
}

/// One trie node, keyed by path segment.
///
/// Exact children live in a map; there is at most one parameter child and at
/// most one wildcard child per node. Registering two routes whose patterns
/// differ only in the parameter name at one position therefore shares (and,
/// for identical shapes, overwrites) the same structure: last registration
/// wins.
#[derive(Default)]
pub struct RouteNode {
    bindings: HashMap<Method, Binding>,
    children: HashMap<String, RouteNode>,
    param_child: Option<Box<RouteNode>>,
    wildcard_child: Option<Box<RouteNode>>,
}

pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl RouteNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, method: Method, path: &str, handler: Handler) {
        let segments = split_segments(path);
        let mut current = self;
        let mut param_names = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    tracing::warn!(path, "route parameter segment has no name, route dropped");
                    return;
                }
                param_names.push(name.to_string());
                let child = current.param_child.get_or_insert_with(|| Box::new(RouteNode::new()));
                current = child.as_mut();
            } else if *segment == "*" {
                if i != segments.len() - 1 {
                    tracing::warn!(path, "wildcard must be the final segment, route dropped");
                    return;
                }
                let child = current
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(RouteNode::new()));
                child.bindings.insert(method, Binding { handler, param_names });
                return;
            } else {
                current = current.children.entry((*segment).to_string()).or_default();
            }
        }

        current.bindings.insert(method, Binding { handler, param_names });
    }

    pub(crate) fn find(&self, method: Method, path: &str) -> NodeMatch {
        let segments = split_segments(path);
        let mut values = Vec::new();
        self.find_recursive(method, &segments, 0, &mut values)
    }

    /// Depth-first walk: exact child first, then the parameter child with the
    /// current segment provisionally bound (undone on backtrack), the
    /// wildcard last. Allowed methods are merged across every explored branch
    /// so a failed walk still reports the full set for the path.
    fn find_recursive(
        &self,
        method: Method,
        segments: &[&str],
        index: usize,
        values: &mut Vec<String>,
    ) -> NodeMatch {
        let mut result = NodeMatch::default();

        if index == segments.len() {
            if !self.bindings.is_empty() {
                result.path_matched = true;
                result.allowed = self.bindings.keys().copied().collect();
                if let Some(binding) = self.bindings.get(&method) {
                    result.handler = Some(binding.handler.clone());
                    result.params = bind_params(&binding.param_names, values);
                }
            }
            return result;
        }

        let segment = segments[index];

        if let Some(child) = self.children.get(segment) {
            let found = child.find_recursive(method, segments, index + 1, values);
            if found.handler.is_some() {
                return found;
            }
            if found.path_matched {
                result.path_matched = true;
                merge_methods(&mut result.allowed, &found.allowed);
            }
        }

        if let Some(child) = &self.param_child {
            values.push(segment.to_string());
            let found = child.find_recursive(method, segments, index + 1, values);
            if found.handler.is_some() {
                return found;
            }
            values.pop();
            if found.path_matched {
                result.path_matched = true;
                merge_methods(&mut result.allowed, &found.allowed);
            }
        }

        if let Some(child) = &self.wildcard_child {
            result.path_matched = true;
            let wildcard_methods: Vec<Method> = child.bindings.keys().copied().collect();
            merge_methods(&mut result.allowed, &wildcard_methods);

            if let Some(binding) = child.bindings.get(&method) {
                result.handler = Some(binding.handler.clone());
                result.params = bind_params(&binding.param_names, values);
                result.wildcards = segments[index..].iter().map(|s| s.to_string()).collect();
            }
        }

        result
    }

    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
        self.children.clear();
        self.param_child = None;
        self.wildcard_child = None;
    }
}

fn bind_params(names: &[String], values: &[String]) -> HashMap<String, String> {
    names
        .iter()
        .zip(values.iter())
        .map(|(n, v)| (n.clone(), v.clone()))
        .collect()
}

fn merge_methods(into: &mut Vec<Method>, from: &[Method]) {
    for method in from {
        if !into.contains(method) {
            into.push(*method);
        }
    }
}
