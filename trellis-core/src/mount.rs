//! Dispatch mounts
//!
//! A [`Mount`] is the runtime table a route tree is attached to. Entries keep
//! their registration order: a route entry answers a request when its verb
//! accepts the request method and its path matches the remaining segments, and
//! a child entry forwards the request when its prefix matches on segment
//! boundaries. The first entry able to handle the request wins.
//!
//! Mount-level middleware wraps everything reachable through the mount, so
//! for a route two levels deep the effective chain is
//! `outer mount middleware → inner mount middleware → route handlers → endpoint`.
//! Errors escaping that chain are offered to error handlers from the innermost
//! mount outwards; the first handler that returns a response wins.
//!
//! ```
//! use trellis_core::{handler_fn, HttpMethod, HttpRequest, HttpResponse, Mount};
//!
//! # tokio_test::block_on(async {
//! let api = Mount::new();
//! api.route(
//!     HttpMethod::GET,
//!     "/users/:id",
//!     Vec::new(),
//!     handler_fn(|req| async move {
//!         let id = req.param("id").cloned().unwrap_or_default();
//!         Ok(HttpResponse::text(id))
//!     }),
//! );
//!
//! let root = Mount::new();
//! root.mount("/api", &api);
//!
//! let response = root.dispatch(HttpRequest::new("GET", "/api/users/7")).await.unwrap();
//! assert_eq!(response.body_text(), "7");
//! # });
//! ```

use crate::error_handler::{ErrorContext, ErrorHandler};
use crate::logging::{debug, trace};
use crate::{Error, HandlerFn, HttpMethod, HttpRequest, HttpResponse, Middleware, MiddlewareChain};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, interior-mutable dispatch table.
///
/// Cloning a `Mount` yields another handle to the same table.
#[derive(Clone, Default)]
pub struct Mount {
    inner: Arc<RwLock<MountInner>>,
}

#[derive(Default)]
struct MountInner {
    entries: Vec<Entry>,
    middleware: Vec<Arc<dyn Middleware>>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
}

enum Entry {
    Route {
        method: HttpMethod,
        path: String,
        chain: Vec<Arc<dyn Middleware>>,
        handler: HandlerFn,
    },
    Child {
        prefix: String,
        mount: Mount,
    },
}

/// Flattened view of a route reachable through a mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedRoute {
    pub method: HttpMethod,
    /// Full path relative to the mount the listing started from
    pub path: String,
    /// Middleware that runs ahead of the endpoint, mount layers included
    pub middleware: usize,
}

struct Resolved {
    params: HashMap<String, String>,
    middleware: Vec<Arc<dyn Middleware>>,
    handler: HandlerFn,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl Mount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `child` under `prefix`. The prefix may contain `:param` segments.
    pub fn mount(&self, prefix: &str, child: &Mount) {
        trace!(prefix = %prefix, "Mounting child");
        self.inner.write().entries.push(Entry::Child {
            prefix: prefix.to_string(),
            mount: child.clone(),
        });
    }

    /// Add middleware that wraps every route reachable through this mount.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.inner.write().middleware.push(middleware);
    }

    /// Register an endpoint preceded by `handlers`, which run in order.
    pub fn route(
        &self,
        method: HttpMethod,
        path: &str,
        handlers: Vec<Arc<dyn Middleware>>,
        endpoint: HandlerFn,
    ) {
        trace!(method = %method, path = %path, handlers = handlers.len(), "Mounting route");
        self.inner.write().entries.push(Entry::Route {
            method,
            path: path.to_string(),
            chain: handlers,
            handler: endpoint,
        });
    }

    /// Add an error handler for failures raised below this mount.
    pub fn use_error_handler(&self, handler: Arc<dyn ErrorHandler>) {
        self.inner.write().error_handlers.push(handler);
    }

    /// Whether both handles refer to the same table
    pub fn ptr_eq(&self, other: &Mount) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Routes registered directly on this mount
    pub fn route_count(&self) -> usize {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| matches!(e, Entry::Route { .. }))
            .count()
    }

    pub fn child_count(&self) -> usize {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| matches!(e, Entry::Child { .. }))
            .count()
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.read().middleware.len()
    }

    pub fn error_handler_count(&self) -> usize {
        self.inner.read().error_handlers.len()
    }

    /// Every route reachable through this mount, in dispatch order.
    pub fn routes(&self) -> Vec<MountedRoute> {
        let mut out = Vec::new();
        self.collect_routes("", 0, &mut out);
        out
    }

    fn collect_routes(&self, base: &str, inherited: usize, out: &mut Vec<MountedRoute>) {
        let inner = self.inner.read();
        let layered = inherited + inner.middleware.len();
        for entry in &inner.entries {
            match entry {
                Entry::Route {
                    method, path, chain, ..
                } => out.push(MountedRoute {
                    method: *method,
                    path: join_paths(base, path),
                    middleware: layered + chain.len(),
                }),
                Entry::Child { prefix, mount } => {
                    mount.collect_routes(&join_paths(base, prefix), layered, out)
                }
            }
        }
    }

    /// Resolve and run a request through this mount tree.
    ///
    /// Fails with [`Error::RouteNotFound`] when no route answers the request;
    /// handler errors that no error handler claims are returned as-is.
    pub async fn dispatch(&self, mut req: HttpRequest) -> Result<HttpResponse, Error> {
        let (path, query) = match req.path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (req.path.clone(), None),
        };

        if let Some(query) = query {
            req.query_params = parse_query_string(&query);
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // Resolution happens synchronously so no lock is held across an await.
        let Some(resolved) = self.resolve(&req.method, &segments) else {
            debug!(method = %req.method, path = %path, "No route matched");
            return Err(Error::RouteNotFound(format!("{} {}", req.method, path)));
        };

        req.path_params = resolved.params;
        req.path = path;
        let ctx = ErrorContext::from_request(&req);

        let chain = MiddlewareChain::from_vec(resolved.middleware);
        match chain.apply(req, resolved.handler).await {
            Ok(response) => Ok(response),
            Err(error) => {
                for handler in &resolved.error_handlers {
                    if let Some(response) = handler.catch(&error, &ctx).await {
                        return Ok(response);
                    }
                }
                Err(error)
            }
        }
    }

    fn resolve(&self, method: &str, segments: &[&str]) -> Option<Resolved> {
        let inner = self.inner.read();

        for entry in &inner.entries {
            match entry {
                Entry::Route {
                    method: declared,
                    path,
                    chain,
                    handler,
                } => {
                    if !declared.accepts(method) {
                        continue;
                    }
                    let Some(params) = match_path(path, segments) else {
                        continue;
                    };

                    let mut middleware = inner.middleware.clone();
                    middleware.extend(chain.iter().cloned());
                    return Some(Resolved {
                        params,
                        middleware,
                        handler: handler.clone(),
                        error_handlers: inner.error_handlers.clone(),
                    });
                }
                Entry::Child { prefix, mount } => {
                    let Some((params, rest)) = match_prefix(prefix, segments) else {
                        continue;
                    };
                    let Some(mut resolved) = mount.resolve(method, rest) else {
                        continue;
                    };

                    for (name, value) in params {
                        resolved.params.entry(name).or_insert(value);
                    }
                    let mut middleware = inner.middleware.clone();
                    middleware.append(&mut resolved.middleware);
                    resolved.middleware = middleware;
                    resolved
                        .error_handlers
                        .extend(inner.error_handlers.iter().cloned());
                    return Some(resolved);
                }
            }
        }

        None
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Match a full route pattern against the remaining request segments
fn match_path(pattern: &str, segments: &[&str]) -> Option<HashMap<String, String>> {
    let pattern_parts = split_segments(pattern);
    if pattern_parts.len() != segments.len() {
        return None;
    }
    capture(&pattern_parts, segments)
}

/// Match a mount prefix against the leading request segments
fn match_prefix<'a, 'b>(
    prefix: &str,
    segments: &'a [&'b str],
) -> Option<(HashMap<String, String>, &'a [&'b str])> {
    let prefix_parts = split_segments(prefix);
    if prefix_parts.len() > segments.len() {
        return None;
    }
    let (head, rest) = segments.split_at(prefix_parts.len());
    capture(&prefix_parts, head).map(|params| (params, rest))
}

fn capture(pattern: &[&str], segments: &[&str]) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    for (pattern_part, segment) in pattern.iter().zip(segments) {
        if let Some(name) = pattern_part.strip_prefix(':') {
            params.insert(name.to_string(), segment.to_string());
        } else if pattern_part != segment {
            return None;
        }
    }
    Some(params)
}

fn join_paths(base: &str, path: &str) -> String {
    let parts: Vec<&str> = split_segments(base)
        .into_iter()
        .chain(split_segments(path))
        .collect();
    format!("/{}", parts.join("/"))
}

/// Parse a query string into a map of parameters
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = split.next()?;
            let value = split.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler_fn, middleware_fn};

    fn text(body: &'static str) -> HandlerFn {
        handler_fn(move |_req| async move { Ok(HttpResponse::text(body)) })
    }

    #[test]
    fn test_match_path_static_and_params() {
        assert!(match_path("/users", &["users"]).is_some());
        assert!(match_path("/users", &["posts"]).is_none());
        assert!(match_path("/", &[]).is_some());

        let params = match_path("/users/:id", &["users", "42"]).unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn test_match_prefix_respects_segment_boundaries() {
        let segments = ["users", "7", "posts"];
        let (params, rest) = match_prefix("/users/:uid", &segments).unwrap();
        assert_eq!(params.get("uid"), Some(&"7".to_string()));
        assert_eq!(rest, &["posts"]);

        assert!(match_prefix("/user", &segments).is_none());
        assert!(match_prefix("/users/7/posts/1", &segments).is_none());
    }

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("page=2&sort=name&flag");
        assert_eq!(params.get("page"), Some(&"2".to_string()));
        assert_eq!(params.get("flag"), Some(&String::new()));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/"), "/");
        assert_eq!(join_paths("/users", "/"), "/users");
        assert_eq!(join_paths("/a/", "b/c"), "/a/b/c");
    }

    #[test]
    fn test_routes_listing() {
        let root = Mount::new();
        let child = Mount::new();
        child.use_middleware(middleware_fn(|req, next| next(req)));
        child.route(HttpMethod::GET, "/", Vec::new(), text("list"));
        root.mount("/users", &child);
        root.route(HttpMethod::ALL, "/health", Vec::new(), text("ok"));

        let routes = root.routes();
        assert_eq!(
            routes,
            vec![
                MountedRoute {
                    method: HttpMethod::GET,
                    path: "/users".into(),
                    middleware: 1,
                },
                MountedRoute {
                    method: HttpMethod::ALL,
                    path: "/health".into(),
                    middleware: 0,
                },
            ]
        );
        assert_eq!(root.route_count(), 1);
        assert_eq!(root.child_count(), 1);
        assert_eq!(child.middleware_count(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_first_match_wins() {
        let root = Mount::new();
        root.route(HttpMethod::GET, "/x", Vec::new(), text("first"));
        root.route(HttpMethod::GET, "/x", Vec::new(), text("second"));

        let response = root.dispatch(HttpRequest::new("GET", "/x")).await.unwrap();
        assert_eq!(response.body_text(), "first");
    }

    #[tokio::test]
    async fn test_dispatch_all_accepts_any_method() {
        let root = Mount::new();
        root.route(HttpMethod::ALL, "/ping", Vec::new(), text("pong"));

        for method in ["GET", "POST", "DELETE"] {
            let response = root
                .dispatch(HttpRequest::new(method, "/ping"))
                .await
                .unwrap();
            assert_eq!(response.body_text(), "pong");
        }
    }

    #[tokio::test]
    async fn test_dispatch_not_found() {
        let root = Mount::new();
        root.route(HttpMethod::GET, "/x", Vec::new(), text("x"));

        let err = root
            .dispatch(HttpRequest::new("POST", "/x?debug=1"))
            .await
            .unwrap_err();
        match err {
            Error::RouteNotFound(msg) => assert_eq!(msg, "POST /x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_sets_query_and_params() {
        let root = Mount::new();
        let child = Mount::new();
        child.route(
            HttpMethod::GET,
            "/:id",
            Vec::new(),
            handler_fn(|req| async move {
                let body = format!(
                    "{}:{}:{}",
                    req.param("org").cloned().unwrap_or_default(),
                    req.param("id").cloned().unwrap_or_default(),
                    req.query("page").cloned().unwrap_or_default()
                );
                Ok(HttpResponse::text(body))
            }),
        );
        root.mount("/orgs/:org", &child);

        let response = root
            .dispatch(HttpRequest::new("GET", "/orgs/acme/9?page=3"))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "acme:9:3");
    }
}
